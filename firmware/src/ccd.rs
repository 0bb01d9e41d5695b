//! CCD video sampling through ADC1.

use embassy_futures::yield_now;
use embassy_stm32::adc::{Adc, SampleTime};
use embassy_stm32::peripherals::{ADC1, PA1};
use embassy_stm32::Peri;
use tcd1304_core::PIXEL_COUNT;

/// Pixels converted between yields to the executor.
const YIELD_EVERY: usize = 256;

/// Reads one full line of pixels from the sensor's OS output on PA1.
pub struct CcdReadout<'d> {
    adc: Adc<'d, ADC1>,
    video: Peri<'d, PA1>,
}

impl<'d> CcdReadout<'d> {
    pub fn new(adc: Peri<'d, ADC1>, video: Peri<'d, PA1>) -> Self {
        let mut adc = Adc::new(adc);
        adc.set_sample_time(SampleTime::CYCLES15);
        Self { adc, video }
    }

    /// Convert all [`PIXEL_COUNT`] pixels into `samples`, 12-bit right-aligned.
    pub async fn read(&mut self, samples: &mut [u16; PIXEL_COUNT]) {
        for (i, sample) in samples.iter_mut().enumerate() {
            *sample = self.adc.blocking_read(&mut self.video);
            if i % YIELD_EVERY == YIELD_EVERY - 1 {
                yield_now().await;
            }
        }
    }
}
