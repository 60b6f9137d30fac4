use thiserror::Error;

use crate::{calendar::CalendarError, domain::task::TaskError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The calendar service is temporarily unavailable. Please retry shortly."
            }
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let message = self.to_string();
        match self {
            Self::Task(_) => InterfaceError::BadRequest { message, correlation_id },
            Self::Calendar(_) => InterfaceError::ServiceUnavailable { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::calendar::CalendarError;
    use crate::domain::task::TaskError;
    use crate::errors::{ApplicationError, InterfaceError};

    #[test]
    fn task_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(TaskError::InvalidIndex { number: 4, len: 2 })
            .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ref message,
            } if correlation_id == "req-1" && message.contains("out of range")
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn calendar_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::from(CalendarError::Request("connection reset".to_owned()))
                .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
        assert_eq!(
            interface.user_message(),
            "The calendar service is temporarily unavailable. Please retry shortly."
        );
    }
}
