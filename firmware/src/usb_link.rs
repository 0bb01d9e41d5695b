//! USB CDC ACM link between the transport and the host.
//!
//! Outgoing data is copied into a [`TxSlot`] by [`UsbLink::transmit`] and
//! written out in full-speed packets by [`usb_tx_task`], which then signals
//! completion to the transport. Incoming packets go straight into the
//! transport's inbound channel from [`usb_rx_task`].

use core::cell::RefCell;

use defmt::{info, warn};
use embassy_stm32::peripherals::USB_OTG_FS;
use embassy_stm32::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_usb::class::cdc_acm::{CdcAcmClass, Receiver, Sender, State};
use embassy_usb::driver::EndpointError;
use embassy_usb::Builder;
use heapless::Vec;
use portable_atomic::{AtomicBool, Ordering};
use tcd1304_core::{Link, LinkReceiver, SendComplete};
use tcd1304_proto::FRAME_SIZE;

pub type UsbDriver = Driver<'static, USB_OTG_FS>;

/// Full-speed bulk endpoint packet size.
pub const MAX_PACKET_SIZE: u16 = 64;

const PACKET: usize = MAX_PACKET_SIZE as usize;

/// The single hand-off in flight, shared between [`UsbLink`] and
/// [`usb_tx_task`].
pub struct TxSlot {
    data: Mutex<CriticalSectionRawMutex, RefCell<Vec<u8, FRAME_SIZE>>>,
    ready: Signal<CriticalSectionRawMutex, ()>,
    connected: AtomicBool,
}

impl TxSlot {
    pub const fn new() -> Self {
        Self {
            data: Mutex::new(RefCell::new(Vec::new())),
            ready: Signal::new(),
            connected: AtomicBool::new(false),
        }
    }

    fn len(&self) -> usize {
        self.data.lock(|data| data.borrow().len())
    }

    fn copy_out(&self, offset: usize, packet: &mut [u8; PACKET]) -> usize {
        self.data.lock(|data| {
            let data = data.borrow();
            let chunk = data.get(offset..).unwrap_or(&[]);
            let len = chunk.len().min(PACKET);
            packet[..len].copy_from_slice(&chunk[..len]);
            len
        })
    }

    fn clear(&self) {
        self.data.lock(|data| data.borrow_mut().clear());
    }
}

impl Default for TxSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// [`Link`] over the CDC ACM IN endpoint.
///
/// Refuses everything while no host has the port open, so queued responses
/// wait in the transport and frames are dropped.
pub struct UsbLink {
    slot: &'static TxSlot,
}

impl UsbLink {
    pub fn new(slot: &'static TxSlot) -> Self {
        Self { slot }
    }
}

impl Link for UsbLink {
    fn transmit(&mut self, bytes: &[u8]) -> bool {
        if !self.slot.connected.load(Ordering::Acquire) {
            return false;
        }
        let accepted = self.slot.data.lock(|data| {
            let mut data = data.borrow_mut();
            data.is_empty() && data.extend_from_slice(bytes).is_ok()
        });
        if accepted {
            self.slot.ready.signal(());
        }
        accepted
    }
}

/// Add the CDC ACM class to `builder`.
pub fn configure_cdc_acm(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut State<'static>,
) -> (Sender<'static, UsbDriver>, Receiver<'static, UsbDriver>) {
    CdcAcmClass::new(builder, state, MAX_PACKET_SIZE).split()
}

async fn write_slot(
    sender: &mut Sender<'static, UsbDriver>,
    slot: &TxSlot,
) -> Result<(), EndpointError> {
    let len = slot.len();
    let mut packet = [0u8; PACKET];
    let mut offset = 0;
    while offset < len {
        let n = slot.copy_out(offset, &mut packet);
        sender.write_packet(&packet[..n]).await?;
        offset += n;
    }
    // a full last packet needs a ZLP to end the transfer
    if len % PACKET == 0 {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}

/// Drain the [`TxSlot`] to the host, one hand-off at a time.
#[embassy_executor::task]
pub async fn usb_tx_task(
    mut sender: Sender<'static, UsbDriver>,
    slot: &'static TxSlot,
    complete: SendComplete<'static>,
) {
    loop {
        sender.wait_connection().await;
        slot.connected.store(true, Ordering::Release);
        info!("host opened the port");

        loop {
            slot.ready.wait().await;
            let result = write_slot(&mut sender, slot).await;
            slot.clear();
            complete.on_link_send_complete();

            if let Err(e) = result {
                warn!("USB write failed: {:?}", e);
                break;
            }
        }

        slot.connected.store(false, Ordering::Release);
        info!("host closed the port");
    }
}

/// Feed received packets into the transport.
#[embassy_executor::task]
pub async fn usb_rx_task(mut receiver: Receiver<'static, UsbDriver>, mut link: LinkReceiver<'static>) {
    let mut packet = [0u8; PACKET];
    loop {
        receiver.wait_connection().await;
        loop {
            match receiver.read_packet(&mut packet).await {
                Ok(n) => {
                    link.receive_from_link(&packet[..n]);
                }
                Err(EndpointError::BufferOverflow) => warn!("oversized OUT packet"),
                Err(EndpointError::Disabled) => break,
            }
        }
    }
}
