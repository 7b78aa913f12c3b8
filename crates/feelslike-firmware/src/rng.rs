//! `rand_core` adapter over the ESP32-S2 hardware RNG.
//!
//! The TLS handshake needs a `CryptoRngCore`. With the radio running the
//! hardware RNG is seeded from RF noise, which is what makes it suitable.

use esp_hal::rng::Rng;

#[derive(Clone, Copy)]
pub struct HardwareRng {
    rng: Rng,
}

impl HardwareRng {
    pub fn new(rng: Rng) -> Self {
        Self { rng }
    }

    pub fn next_seed(&mut self) -> u64 {
        rand_core::RngCore::next_u64(self)
    }
}

impl rand_core::RngCore for HardwareRng {
    fn next_u32(&mut self) -> u32 {
        self.rng.random()
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.rng.random()) << 32) | u64::from(self.rng.random())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.rng.random().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for HardwareRng {}
