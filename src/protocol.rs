//! Broker-reported error codes.
//!
//! Only the codes the admin layer reacts to are named; everything else is kept as [`Error::Unknown`] so that
//! session implementations can pass wire codes through without losing them.
//!
//! # References
//! - <https://kafka.apache.org/protocol#protocol_error_codes>

/// Error code reported by the broker for a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    UnknownTopicOrPartition,
    RequestTimedOut,
    CoordinatorNotAvailable,
    NotCoordinator,
    TopicAuthorizationFailed,
    GroupAuthorizationFailed,
    ClusterAuthorizationFailed,
    TopicAlreadyExists,
    InvalidPartitions,
    InvalidReplicationFactor,
    InvalidConfig,
    NotController,
    InvalidRequest,
    GroupIdNotFound,
    Unknown(i16),
}

impl Error {
    /// Wire error code.
    pub fn code(&self) -> i16 {
        match self {
            Self::UnknownTopicOrPartition => 3,
            Self::RequestTimedOut => 7,
            Self::CoordinatorNotAvailable => 15,
            Self::NotCoordinator => 16,
            Self::TopicAuthorizationFailed => 29,
            Self::GroupAuthorizationFailed => 30,
            Self::ClusterAuthorizationFailed => 31,
            Self::TopicAlreadyExists => 36,
            Self::InvalidPartitions => 37,
            Self::InvalidReplicationFactor => 38,
            Self::InvalidConfig => 40,
            Self::NotController => 41,
            Self::InvalidRequest => 42,
            Self::GroupIdNotFound => 69,
            Self::Unknown(code) => *code,
        }
    }

    /// The requested topic or group does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownTopicOrPartition | Self::GroupIdNotFound)
    }

    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::TopicAuthorizationFailed
                | Self::GroupAuthorizationFailed
                | Self::ClusterAuthorizationFailed
        )
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Error::UnknownTopicOrPartition.code(), 3);
        assert_eq!(Error::TopicAlreadyExists.code(), 36);
        assert_eq!(Error::GroupIdNotFound.code(), 69);
        assert_eq!(Error::Unknown(1000).code(), 1000);
        assert_eq!(Error::Unknown(1000).to_string(), "Unknown(1000)");
    }

    #[test]
    fn test_classification() {
        assert!(Error::GroupIdNotFound.is_not_found());
        assert!(Error::UnknownTopicOrPartition.is_not_found());
        assert!(!Error::TopicAlreadyExists.is_not_found());
        assert!(Error::ClusterAuthorizationFailed.is_authorization_failure());
        assert!(!Error::InvalidConfig.is_authorization_failure());
    }
}
