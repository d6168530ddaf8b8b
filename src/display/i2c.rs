//! Opening SSD1306 panels on the Pi's I2C buses

use linux_embedded_hal::I2cdev;

use super::{Ssd1306, Ssd1306Config};
use crate::{Error, Result};

/// Open `/dev/i2c-<bus>` and initialise the panel at `config.address`
///
/// # Errors
///
/// Returns error if the bus cannot be opened or the panel does not answer
pub fn open_i2c_display(bus: u8, config: Ssd1306Config) -> Result<Ssd1306<I2cdev>> {
    let path = format!("/dev/i2c-{bus}");
    let dev = I2cdev::new(&path)
        .map_err(|e| Error::I2c(format!("failed to open {path}: {e:?}")))?;

    let mut display = Ssd1306::new(dev, config)?;
    display.init()?;

    tracing::info!(
        bus = %path,
        address = %format!("{:#04x}", config.address),
        "oled display ready"
    );
    Ok(display)
}
