//! TIM2 integration timer.
//!
//! TIM2 runs from the 84 MHz APB1 timer clock without prescaler. Its period
//! sets the integration time and channel 1 (PA0, AF1) drives the ICG pulse
//! in PWM mode 1.

use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::Moder;
use embassy_stm32::pac::timer::vals::Ocm;
use embassy_stm32::peripherals::{PA0, TIM2};
use embassy_stm32::Peri;
use tcd1304_core::IntegrationTimer;

const ICG_PIN: usize = 0;
const ICG_AF: u8 = 1;
const CHANNEL: usize = 0;

/// [`IntegrationTimer`] backed by TIM2 channel 1.
pub struct Tim2Integration<'d> {
    _tim: Peri<'d, TIM2>,
    _icg: Peri<'d, PA0>,
}

impl<'d> Tim2Integration<'d> {
    /// Take TIM2 and its output pin. The counter stays stopped until the
    /// first [`IntegrationTimer::restart`].
    pub fn new(tim: Peri<'d, TIM2>, icg: Peri<'d, PA0>) -> Self {
        pac::RCC.apb1enr().modify(|w| w.set_tim2en(true));

        pac::GPIOA
            .moder()
            .modify(|w| w.set_moder(ICG_PIN, Moder::ALTERNATE));
        pac::GPIOA.afr(0).modify(|w| w.set_afr(ICG_PIN, ICG_AF));

        let regs = pac::TIM2;
        regs.cr1().modify(|w| {
            w.set_cen(false);
            w.set_arpe(true);
        });
        regs.psc().write_value(0);
        regs.ccmr_output(0).modify(|w| {
            w.set_ocm(CHANNEL, Ocm::PWM_MODE1);
            w.set_ocpe(CHANNEL, true);
        });
        regs.ccer().modify(|w| w.set_cce(CHANNEL, true));

        Self {
            _tim: tim,
            _icg: icg,
        }
    }
}

impl IntegrationTimer for Tim2Integration<'_> {
    fn reconfigure(&mut self, period_ticks: u32, pulse_ticks: u32) {
        let regs = pac::TIM2;
        regs.cr1().modify(|w| w.set_cen(false));
        regs.arr().write_value(period_ticks);
        regs.ccr(CHANNEL).write_value(pulse_ticks);
    }

    fn restart(&mut self) {
        let regs = pac::TIM2;
        regs.cnt().write_value(0);
        // load the preloaded ARR/CCR values now
        regs.egr().write(|w| w.set_ug(true));
        regs.cr1().modify(|w| w.set_cen(true));
    }
}
