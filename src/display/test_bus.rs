//! Recording I2C bus for driver tests

use std::sync::{Arc, Mutex};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

/// Bus that records every write as `(address, bytes)`
#[derive(Clone, Default)]
pub struct RecordingBus {
    pub writes: Arc<Mutex<Vec<(u8, Vec<u8>)>>>,
    pub fail: bool,
}

#[derive(Debug)]
pub struct BusError;

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for RecordingBus {
    type Error = BusError;
}

impl I2c for RecordingBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err(BusError);
        }
        for op in operations {
            if let Operation::Write(bytes) = op {
                self.writes.lock().unwrap().push((address, bytes.to_vec()));
            }
        }
        Ok(())
    }
}
