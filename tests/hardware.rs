//! Drivers over a recording I2C bus

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use pebo::arms::{Arms, ArmsConfig, Pca9685};
use pebo::display::{Ssd1306, Ssd1306Config};
use pebo::eyes::EyesConfig;
use pebo::RoboEyesDual;

type Writes = Arc<Mutex<Vec<(u8, Vec<u8>)>>>;

#[derive(Clone, Default)]
struct Bus {
    writes: Writes,
}

#[derive(Debug)]
struct BusError;

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for Bus {
    type Error = BusError;
}

impl I2c for Bus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations {
            if let Operation::Write(bytes) = op {
                self.writes.lock().unwrap().push((address, bytes.to_vec()));
            }
        }
        Ok(())
    }
}

fn writes_to(writes: &Writes, address: u8) -> Vec<Vec<u8>> {
    writes
        .lock()
        .unwrap()
        .iter()
        .filter(|(a, _)| *a == address)
        .map(|(_, b)| b.clone())
        .collect()
}

#[test]
fn test_eyes_on_two_panels_share_a_bus() {
    let bus = Bus::default();
    let panel = |address| Ssd1306Config {
        address,
        ..Ssd1306Config::default()
    };

    let mut left = Ssd1306::new(bus.clone(), panel(0x3C)).unwrap();
    let mut right = Ssd1306::new(bus.clone(), panel(0x3D)).unwrap();
    left.init().unwrap();
    right.init().unwrap();

    let mut eyes = RoboEyesDual::with_seed(left, right, EyesConfig::default(), 3).unwrap();
    eyes.begin().unwrap();

    let start = Instant::now();
    for i in 0..10u32 {
        eyes.draw_frame(start + Duration::from_millis(33) * i).unwrap();
    }

    // init + (window + 32 data chunks) per frame, begin() included
    let expected = 1 + 11 * 33;
    assert_eq!(writes_to(&bus.writes, 0x3C).len(), expected);
    assert_eq!(writes_to(&bus.writes, 0x3D).len(), expected);
}

#[test]
fn test_arms_on_pca9685() {
    let bus = Bus::default();
    let mut pca = Pca9685::new(bus.clone(), 0x40);
    pca.init(50).unwrap();

    let mut arms = Arms::new(pca, ArmsConfig::default()).unwrap();
    arms.set_angles(90.0, 90.0).unwrap();

    let writes = writes_to(&bus.writes, 0x40);
    // LED0 and LED1 registers, mid pulse (1500us) at 50Hz is 307 ticks
    let led0 = writes.iter().rev().find(|w| w[0] == 0x06).unwrap();
    let led1 = writes.iter().rev().find(|w| w[0] == 0x0A).unwrap();
    assert_eq!(u16::from_le_bytes([led0[3], led0[4]]), 307);
    assert_eq!(u16::from_le_bytes([led1[3], led1[4]]), 307);

    arms.release().unwrap();
    let writes = writes_to(&bus.writes, 0x40);
    let last = writes.last().unwrap();
    assert_eq!(last[0], 0x0A);
    // full-off bit
    assert_eq!(last[4], 0x10);
}
