use std::sync::{Arc, Mutex};

use crate::capture::domain::capture_device::{
    CaptureDevice, CaptureError, FacingMode, SharedStream,
};

/// Owns at most one active capture for a facing mode.
pub struct StreamSession {
    device: Box<dyn CaptureDevice>,
    facing_mode: FacingMode,
    stream: Option<SharedStream>,
}

impl StreamSession {
    pub fn new(device: Box<dyn CaptureDevice>, facing_mode: FacingMode) -> Self {
        Self {
            device,
            facing_mode,
            stream: None,
        }
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<SharedStream> {
        self.stream.clone()
    }

    /// Opens a capture for the current facing mode. Returns the already
    /// active stream if there is one. On failure the session stays idle.
    pub fn start(&mut self) -> Result<SharedStream, CaptureError> {
        if let Some(stream) = &self.stream {
            return Ok(stream.clone());
        }
        let stream = self.device.open(self.facing_mode)?;
        log::info!("Capture started ({} camera)", self.facing_mode);
        let shared: SharedStream = Arc::new(Mutex::new(stream));
        self.stream = Some(shared.clone());
        Ok(shared)
    }

    /// Halts the capture and detaches it. No-op when idle.
    pub fn stop(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        match stream.lock() {
            Ok(mut s) => s.stop(),
            Err(poisoned) => poisoned.into_inner().stop(),
        }
        log::info!("Capture stopped ({} camera)", self.facing_mode);
    }

    /// Stops the current capture, toggles the facing mode and starts again.
    ///
    /// The facing mode stays toggled even if the new capture fails to start.
    pub fn flip(&mut self) -> Result<SharedStream, CaptureError> {
        self.stop();
        self.facing_mode = self.facing_mode.opposite();
        self.start()
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::capture::domain::capture_device::CaptureStream;
    use crate::shared::frame::Frame;

    /// Shared counters observed by tests after the device is boxed away.
    #[derive(Default)]
    pub struct DeviceCounters {
        pub opened: Mutex<Vec<FacingMode>>,
        pub live: AtomicUsize,
        pub max_live: AtomicUsize,
        pub stops: AtomicUsize,
        pub reads: AtomicUsize,
        pub deny: AtomicBool,
        pub fail_reads: AtomicBool,
    }

    pub struct FakeDevice {
        pub counters: Arc<DeviceCounters>,
    }

    impl CaptureDevice for FakeDevice {
        fn open(&mut self, facing: FacingMode) -> Result<Box<dyn CaptureStream>, CaptureError> {
            if self.counters.deny.load(Ordering::SeqCst) {
                return Err(CaptureError::PermissionDenied("denied by user".into()));
            }
            self.counters.opened.lock().unwrap().push(facing);
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.max_live.fetch_max(live, Ordering::SeqCst);
            Ok(Box::new(FakeStream {
                counters: self.counters.clone(),
                live: true,
            }))
        }
    }

    pub struct FakeStream {
        counters: Arc<DeviceCounters>,
        live: bool,
    }

    impl CaptureStream for FakeStream {
        fn read_frame(&mut self) -> Result<Frame, CaptureError> {
            if !self.live {
                return Err(CaptureError::Closed);
            }
            let n = self.counters.reads.fetch_add(1, Ordering::SeqCst);
            if self.counters.fail_reads.load(Ordering::SeqCst) {
                return Err(CaptureError::Backend("frame dropped".into()));
            }
            Ok(Frame::new(vec![128; 64 * 48 * 3], 64, 48, 3, n))
        }

        fn stop(&mut self) {
            if self.live {
                self.live = false;
                self.counters.live.fetch_sub(1, Ordering::SeqCst);
                self.counters.stops.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_live(&self) -> bool {
            self.live
        }
    }

    pub fn fake_session(facing: FacingMode) -> (StreamSession, Arc<DeviceCounters>) {
        let counters = Arc::new(DeviceCounters::default());
        let device = FakeDevice {
            counters: counters.clone(),
        };
        (StreamSession::new(Box::new(device), facing), counters)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::test_support::fake_session;
    use super::*;

    #[test]
    fn test_start_opens_current_facing_mode() {
        let (mut session, counters) = fake_session(FacingMode::User);
        session.start().unwrap();
        assert!(session.is_active());
        assert_eq!(*counters.opened.lock().unwrap(), vec![FacingMode::User]);
    }

    #[test]
    fn test_start_twice_reuses_stream() {
        let (mut session, counters) = fake_session(FacingMode::User);
        let a = session.start().unwrap();
        let b = session.start().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(counters.opened.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_denied_start_leaves_session_idle() {
        let (mut session, counters) = fake_session(FacingMode::User);
        counters.deny.store(true, Ordering::SeqCst);
        let err = session.start().unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied(_)));
        assert!(!session.is_active());
    }

    #[test]
    fn test_stop_halts_tracks_and_is_idempotent() {
        let (mut session, counters) = fake_session(FacingMode::User);
        let stream = session.start().unwrap();
        session.stop();
        session.stop();
        assert!(!session.is_active());
        assert!(!stream.lock().unwrap().is_live());
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_flip_stops_before_starting_opposite() {
        let (mut session, counters) = fake_session(FacingMode::User);
        session.start().unwrap();
        session.flip().unwrap();

        assert_eq!(session.facing_mode(), FacingMode::Environment);
        assert_eq!(
            *counters.opened.lock().unwrap(),
            vec![FacingMode::User, FacingMode::Environment]
        );
        assert_eq!(counters.max_live.load(Ordering::SeqCst), 1);
        assert_eq!(counters.live.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases_capture() {
        let (mut session, counters) = fake_session(FacingMode::Environment);
        session.start().unwrap();
        drop(session);
        assert_eq!(counters.live.load(Ordering::SeqCst), 0);
    }
}
