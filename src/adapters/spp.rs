//! Bluetooth Classic SPP transport: the wireless serial command channel.
//!
//! The device runs an SPP server (RFCOMM, no security) and is discoverable
//! under the configured name. One client at a time; bytes it writes are
//! queued for [`Transport::read`], and writes go back on the same link.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: the controller and Bluedroid are brought up
//!   by `esp_idf_svc::bt::BtDriver` in Classic mode; SPP itself runs in
//!   callback mode via raw `esp_idf_svc::sys` calls. Bluedroid callbacks are
//!   C function pointers that cannot capture Rust state, so the link handle
//!   and receive queue live in statics.
//! - **all other targets**: in-memory simulation driven by
//!   [`SppTransport::on_connect`] / [`SppTransport::on_data`].

use log::{info, warn};

use crate::channel::Transport;
use crate::error::ChannelError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::bt::{BtClassic, BtDriver};

/// Bytes buffered between the Bluedroid task and the command loop.
pub const RX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SppState {
    Idle,
    Listening,
    Connected,
    Failed,
}

// ── ESP-IDF SPP static state ──────────────────────────────────

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Open SPP connection handle, 0 when no client is connected.
#[cfg(target_os = "espidf")]
static SPP_HANDLE: AtomicU32 = AtomicU32::new(0);

/// Bytes dropped because the receive queue was full.
#[cfg(target_os = "espidf")]
static SPP_RX_DROPPED: AtomicU32 = AtomicU32::new(0);

// SPP callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static SPP_RX: std::sync::Mutex<heapless::Deque<u8, RX_CAPACITY>> =
    std::sync::Mutex::new(heapless::Deque::new());

#[cfg(target_os = "espidf")]
const SPP_SERVER_NAME: &[u8] = b"SPP_SERVER\0";

#[cfg(target_os = "espidf")]
unsafe extern "C" fn spp_event_handler(
    event: esp_idf_svc::sys::esp_spp_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_spp_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_spp_cb_event_t_ESP_SPP_INIT_EVT => {
            log::info!("SPP: initialised, starting server");
            let ret = unsafe {
                esp_spp_start_srv(
                    ESP_SPP_SEC_NONE as esp_spp_sec_t,
                    esp_spp_role_t_ESP_SPP_ROLE_SLAVE,
                    0,
                    SPP_SERVER_NAME.as_ptr() as *const _,
                )
            };
            let _ = check(ret, "spp_start_srv");
        }
        esp_spp_cb_event_t_ESP_SPP_START_EVT => {
            log::info!("SPP: server listening, discoverable");
            let ret = unsafe {
                esp_bt_gap_set_scan_mode(
                    esp_bt_connection_mode_t_ESP_BT_CONNECTABLE,
                    esp_bt_discovery_mode_t_ESP_BT_GENERAL_DISCOVERABLE,
                )
            };
            let _ = check(ret, "bt_gap_set_scan_mode");
        }
        esp_spp_cb_event_t_ESP_SPP_SRV_OPEN_EVT => {
            let p = unsafe { &(*param).srv_open };
            SPP_HANDLE.store(p.handle, AtomicOrdering::Relaxed);
            log::info!("SPP: client connected (handle={})", p.handle);
        }
        esp_spp_cb_event_t_ESP_SPP_CLOSE_EVT => {
            SPP_HANDLE.store(0, AtomicOrdering::Relaxed);
            log::info!("SPP: client disconnected");
        }
        esp_spp_cb_event_t_ESP_SPP_DATA_IND_EVT => {
            let p = unsafe { &(*param).data_ind };
            let data = unsafe { core::slice::from_raw_parts(p.data, p.len as usize) };
            if let Ok(mut rx) = SPP_RX.lock() {
                for &b in data {
                    if rx.push_back(b).is_err() {
                        SPP_RX_DROPPED.fetch_add(1, AtomicOrdering::Relaxed);
                    }
                }
            }
        }
        _ => {}
    }
}

// ── Transport ─────────────────────────────────────────────────

pub struct SppTransport {
    state: SppState,
    /// Keeps the controller and Bluedroid enabled for the transport's life.
    #[cfg(target_os = "espidf")]
    _bt: BtDriver<'static, BtClassic>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimLink,
}


/// Simulation: the remote end of the link.
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
struct SimLink {
    device_name: Option<String>,
    connected: bool,
    rx: heapless::Deque<u8, RX_CAPACITY>,
    rx_dropped: u32,
    tx: Vec<u8>,
}

#[cfg(not(target_os = "espidf"))]
impl Default for SppTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SppTransport {
    /// Wrap a Classic-mode driver. The controller and Bluedroid are already
    /// enabled; `open` only names the device and starts the SPP server.
    #[cfg(target_os = "espidf")]
    pub fn new(bt: BtDriver<'static, BtClassic>) -> Self {
        Self {
            state: SppState::Idle,
            _bt: bt,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: SppState::Idle,
            sim: SimLink::default(),
        }
    }

    pub fn state(&self) -> SppState {
        #[cfg(target_os = "espidf")]
        {
            if self.state == SppState::Listening && SPP_HANDLE.load(AtomicOrdering::Relaxed) != 0 {
                return SppState::Connected;
            }
        }
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SppState::Connected
    }

    /// Bytes lost because the receive queue was full.
    pub fn rx_dropped(&self) -> u32 {
        #[cfg(target_os = "espidf")]
        {
            SPP_RX_DROPPED.load(AtomicOrdering::Relaxed)
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.sim.rx_dropped
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_open(&mut self, device_name: &str) -> Result<(), ChannelError> {
        use esp_idf_svc::sys::*;

        let mut c_name = heapless::Vec::<u8, 33>::new();
        if c_name.extend_from_slice(device_name.as_bytes()).is_err() || c_name.push(0).is_err() {
            return Err(ChannelError::InvalidName);
        }

        // SAFETY: called once from the main task before the command loop,
        // with Bluedroid enabled by `BtDriver`; it copies the name and config.
        unsafe {
            check(
                esp_bt_gap_set_device_name(c_name.as_ptr() as *const _),
                "set_device_name",
            )?;

            check(
                esp_spp_register_callback(Some(spp_event_handler)),
                "spp_register_callback",
            )?;
            let spp_cfg = esp_spp_cfg_t {
                mode: esp_spp_mode_t_ESP_SPP_MODE_CB,
                enable_l2cap_ertm: true,
                tx_buffer_size: 0,
            };
            check(esp_spp_enhanced_init(&spp_cfg), "spp_enhanced_init")?;
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_open(&mut self, device_name: &str) -> Result<(), ChannelError> {
        info!("SPP(sim): advertising as '{}'", device_name);
        self.sim.device_name = Some(device_name.to_string());
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn check(ret: esp_idf_svc::sys::esp_err_t, what: &str) -> Result<(), ChannelError> {
    if ret == esp_idf_svc::sys::ESP_OK as esp_idf_svc::sys::esp_err_t {
        Ok(())
    } else {
        log::error!("SPP: {} failed ({})", what, ret);
        Err(ChannelError::InitFailed(ret))
    }
}

// ── Simulation hooks (host only) ──────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl SppTransport {
    /// Name passed to `open`, if it succeeded.
    pub fn advertised_name(&self) -> Option<&str> {
        self.sim.device_name.as_deref()
    }

    /// A client connected.
    pub fn on_connect(&mut self) {
        if self.state == SppState::Listening {
            self.state = SppState::Connected;
            self.sim.connected = true;
            info!("SPP(sim): client connected");
        } else {
            warn!("SPP(sim): connect ignored in state {:?}", self.state);
        }
    }

    /// The client went away. Unread bytes are kept, as on the device.
    pub fn on_disconnect(&mut self) {
        if self.state == SppState::Connected {
            self.state = SppState::Listening;
        }
        self.sim.connected = false;
        info!("SPP(sim): client disconnected");
    }

    /// The client wrote `data`.
    pub fn on_data(&mut self, data: &[u8]) {
        if !self.sim.connected {
            warn!("SPP(sim): data without a client ignored");
            return;
        }
        for &b in data {
            if self.sim.rx.push_back(b).is_err() {
                self.sim.rx_dropped = self.sim.rx_dropped.wrapping_add(1);
            }
        }
    }

    /// Everything sent to the client since the last call.
    pub fn take_sent(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.sim.tx)
    }
}

impl Transport for SppTransport {
    fn open(&mut self, device_name: &str) -> Result<(), ChannelError> {
        if self.state != SppState::Idle {
            warn!("SPP: open called twice (state {:?})", self.state);
            return Ok(());
        }
        match self.platform_open(device_name) {
            Ok(()) => {
                self.state = SppState::Listening;
                Ok(())
            }
            Err(e) => {
                self.state = SppState::Failed;
                Err(e)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let mut rx = SPP_RX.lock().map_err(|_| ChannelError::ReadFailed)?;
        let mut n = 0;
        while n < buf.len() {
            match rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChannelError> {
        let mut n = 0;
        while n < buf.len() {
            match self.sim.rx.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    #[cfg(target_os = "espidf")]
    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        let handle = SPP_HANDLE.load(AtomicOrdering::Relaxed);
        if handle == 0 {
            return Err(ChannelError::NotConnected);
        }
        // SAFETY: Bluedroid copies `data` before esp_spp_write returns.
        let ret = unsafe {
            esp_idf_svc::sys::esp_spp_write(handle, data.len() as i32, data.as_ptr() as *mut u8)
        };
        if ret == esp_idf_svc::sys::ESP_OK as esp_idf_svc::sys::esp_err_t {
            Ok(data.len())
        } else {
            Err(ChannelError::WriteFailed)
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write(&mut self, data: &[u8]) -> Result<usize, ChannelError> {
        if !self.sim.connected {
            return Err(ChannelError::NotConnected);
        }
        self.sim.tx.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn available(&self) -> bool {
        SPP_RX.lock().map(|rx| !rx.is_empty()).unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn available(&self) -> bool {
        !self.sim.rx.is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────
