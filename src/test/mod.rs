//! Test support


use crate::config::RadioConfig;
use crate::radio::{Pins, Sx1276};
use fixtures::{Chip, FakeClock, FakeDelay, FakeDio0, FakeReset, FakeSpi};

pub type TestRadio = Sx1276<FakeSpi, FakeReset, FakeDio0, FakeDelay, FakeClock>;

/// Driver wired to a fresh simulated chip, not yet started
pub fn radio(config: RadioConfig) -> (TestRadio, Chip) {
    let chip = Chip::new();
    let pins = Pins {
        reset: chip.reset(),
        dio0: chip.dio0(),
    };
    let radio = Sx1276::new(chip.spi(), pins, chip.delay(), chip.clock(), config);

    (radio, chip)
}

/// Driver after a successful `begin`, with the chip's logs cleared
pub fn started(config: RadioConfig) -> (TestRadio, Chip) {
    let (mut radio, chip) = radio(config);
    radio.begin().unwrap();
    chip.borrow_mut().clear_log();

    (radio, chip)
}
