//! Provider value object identifying a conversational-AI backend

use crate::core::error::DomainError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The conversational-AI backends the gateway can dispatch to (Value Object)
///
/// Each variant corresponds to one configured upstream service with its own
/// transport and credentials. The set is closed: an unknown key in a request
/// is a selector error, not a custom provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// iFlytek Spark, reached over a signed WebSocket connection
    Spark,
    /// Baidu Qianfan, reached over bearer-token HTTP
    Qianfan,
    /// ByteDance Doubao, reached over bearer-token HTTP
    Doubao,
}

impl Provider {
    /// Wire key used in requests and configuration sections
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Spark => "spark",
            Provider::Qianfan => "qianfan",
            Provider::Doubao => "doubao",
        }
    }

    /// Stable human-readable label used in results and history records
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Spark => "Spark",
            Provider::Qianfan => "Qianfan",
            Provider::Doubao => "Doubao",
        }
    }

    /// All known providers, in stable result order
    pub fn all() -> [Provider; 3] {
        [Provider::Spark, Provider::Qianfan, Provider::Doubao]
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spark" => Ok(Provider::Spark),
            "qianfan" => Ok(Provider::Qianfan),
            "doubao" => Ok(Provider::Doubao),
            other => Err(DomainError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl Serialize for Provider {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Caller-specified choice of which providers answer a question
///
/// `All` fans the question out to every registered provider; `One` asks a
/// single named backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSelector {
    All,
    One(Provider),
}

impl ProviderSelector {
    /// Wire key for this selector ("all" or the provider key)
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderSelector::All => "all",
            ProviderSelector::One(p) => p.as_str(),
        }
    }
}

impl Default for ProviderSelector {
    /// Requests that name no provider fan out to all of them
    fn default() -> Self {
        ProviderSelector::All
    }
}

impl std::fmt::Display for ProviderSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderSelector {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(ProviderSelector::All)
        } else {
            s.parse().map(ProviderSelector::One)
        }
    }
}
