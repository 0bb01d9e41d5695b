//! TCD1304 linear CCD readout firmware for STM32F401.
//!
//! This crate binds the platform-agnostic transport and command handling in
//! `tcd1304-core` to the hardware: USB CDC ACM for the host link, TIM2 for
//! the integration period and ADC1 for the video signal.

#![no_std]

// Re-export core types for convenience
pub use tcd1304_core::{
    CommandProcessor, ReadoutOutcome, ReadoutPublisher, TransportState, FRAME_SIZE, PIXEL_COUNT,
};

pub mod ccd;
pub mod timer;
pub mod usb_link;

pub use ccd::CcdReadout;
pub use timer::Tim2Integration;
pub use usb_link::{configure_cdc_acm, usb_rx_task, usb_tx_task, TxSlot, UsbDriver, UsbLink};

/// 84 MHz system clock from an 8 MHz HSE bypass (ST-LINK MCO), 48 MHz for
/// USB from PLL Q.
#[must_use]
pub fn clock_config() -> embassy_stm32::Config {
    use embassy_stm32::rcc::{
        mux, AHBPrescaler, APBPrescaler, Hse, HseMode, Pll, PllMul, PllPDiv, PllPreDiv, PllQDiv,
        PllSource, Sysclk,
    };
    use embassy_stm32::time::Hertz;

    let mut config = embassy_stm32::Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz(8_000_000),
        mode: HseMode::Bypass,
    });
    config.rcc.pll_src = PllSource::HSE;
    config.rcc.pll = Some(Pll {
        prediv: PllPreDiv::DIV4,
        mul: PllMul::MUL168,
        divp: Some(PllPDiv::DIV4),
        divq: Some(PllQDiv::DIV7),
        divr: None,
    });
    config.rcc.ahb_pre = AHBPrescaler::DIV1;
    config.rcc.apb1_pre = APBPrescaler::DIV2;
    config.rcc.apb2_pre = APBPrescaler::DIV1;
    config.rcc.sys = Sysclk::PLL1_P;
    config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    config
}
