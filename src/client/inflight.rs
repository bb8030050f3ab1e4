use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use super::error::ClientError;

/// Keys of mutations currently on the wire. A second `begin` for the same
/// key fails until the first ticket is dropped.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    keys: Arc<Mutex<HashSet<String>>>,
}

/// Held for the duration of one mutation.
#[derive(Debug)]
pub struct Ticket {
    keys: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlight {
    pub fn begin(&self, key: impl Into<String>) -> Result<Ticket, ClientError> {
        let key = key.into();
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert(key.clone()) {
            return Err(ClientError::Busy(key));
        }
        Ok(Ticket {
            keys: Arc::clone(&self.keys),
            key,
        })
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_begin_is_refused_until_ticket_drops() {
        let guard = InFlight::default();

        let ticket = guard.begin("timesheet:1:submit").unwrap();
        assert!(guard.is_busy("timesheet:1:submit"));
        assert!(matches!(
            guard.begin("timesheet:1:submit"),
            Err(ClientError::Busy(_))
        ));

        // Other keys are independent.
        assert!(guard.begin("timesheet:2:submit").is_ok());

        drop(ticket);
        assert!(!guard.is_busy("timesheet:1:submit"));
        assert!(guard.begin("timesheet:1:submit").is_ok());
    }
}
