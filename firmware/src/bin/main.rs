#![no_std]
#![no_main]

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_stm32::bind_interrupts;
use embassy_stm32::peripherals::USB_OTG_FS;
use embassy_stm32::usb::{self, Driver};
use embassy_time::Timer;
use embassy_usb::class::cdc_acm::State;
use embassy_usb::{Builder, Config as UsbConfig};
use static_cell::{ConstStaticCell, StaticCell};
use tcd1304_firmware::{
    clock_config, configure_cdc_acm, usb_rx_task, usb_tx_task, CcdReadout, CommandProcessor,
    ReadoutOutcome, ReadoutPublisher, Tim2Integration, TransportState, TxSlot, UsbDriver, UsbLink,
    PIXEL_COUNT,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    OTG_FS => usb::InterruptHandler<USB_OTG_FS>;
});

/// Transport channels, counters and bulk-send flag.
static TRANSPORT: StaticCell<TransportState> = StaticCell::new();
static TX_SLOT: TxSlot = TxSlot::new();

/// Frame buffer and counter; too large for the main task's stack.
static PUBLISHER: ConstStaticCell<ReadoutPublisher> = ConstStaticCell::new(ReadoutPublisher::new());
static SAMPLES: ConstStaticCell<[u16; PIXEL_COUNT]> = ConstStaticCell::new([0; PIXEL_COUNT]);

/// USB device configuration buffers.
static EP_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// CDC ACM state.
static CDC_STATE: StaticCell<State> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("TCD1304 firmware v{} starting...", env!("CARGO_PKG_VERSION"));

    let p = embassy_stm32::init(clock_config());

    // --- USB Setup ---
    let mut driver_config = usb::Config::default();
    // PA9 is not wired to VBUS on the Nucleo board
    driver_config.vbus_detection = false;
    let usb_driver = Driver::new_fs(
        p.USB_OTG_FS,
        Irqs,
        p.PA12, // D+
        p.PA11, // D-
        EP_OUT_BUFFER.init([0; 256]),
        driver_config,
    );

    let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
    usb_config.manufacturer = Some("TCD1304");
    usb_config.product = Some("TCD1304 Linear CCD");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUF.init([0; 64]),
    );
    let (sender, receiver) = configure_cdc_acm(&mut builder, CDC_STATE.init(State::new()));
    let usb_device = builder.build();

    // --- Transport ---
    let transport_state = TRANSPORT.init(TransportState::new());
    let (link_rx, complete, mut transport) = transport_state.split(UsbLink::new(&TX_SLOT));

    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(usb_rx_task(receiver, link_rx).unwrap());
    spawner.spawn(usb_tx_task(sender, &TX_SLOT, complete).unwrap());

    // --- Sensor ---
    let mut processor = CommandProcessor::new(Tim2Integration::new(p.TIM2, p.PA0));
    let mut ccd = CcdReadout::new(p.ADC1, p.PA1);
    let publisher = PUBLISHER.take();
    let samples = SAMPLES.take();

    processor.send_ready(&mut transport);
    info!("TCD1304 initialized, waiting for commands...");

    loop {
        processor.poll(&mut transport);

        if processor.is_acquiring() {
            Timer::after_micros(u64::from(processor.integration_time_us())).await;
            ccd.read(samples).await;
            match publisher.publish(&samples[..], processor.state(), &mut transport) {
                Ok(ReadoutOutcome::Dropped { counter, error }) => {
                    warn!("frame {} dropped: {}", counter, error);
                }
                Ok(_) => {}
                Err(e) => error!("frame build failed: {}", e),
            }
            #[cfg(debug_assertions)]
            let _ = publisher.verify();
        }

        transport.process();
        yield_now().await;
    }
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, UsbDriver>) {
    device.run().await;
}
