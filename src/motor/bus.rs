// Exclusive-access i2c bus shared between the motor module and other bus users.
//
// The raw transport (Linux /dev/i2c-*, a fake chip in tests) sits behind the
// `I2cTransport` trait. `SharedBus` adds the exclusivity primitive on top: a
// blocking, timeout-bounded `acquire` built on Mutex + Condvar, so a
// multi-register transaction can never interleave with another bus client.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Default cap on how long `acquire` waits for exclusive access.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(500);

/// Error types for bus access
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("bus not acquired within {0:?}")]
    Acquisition(Duration),

    #[error("i2c transaction failed: {0}")]
    Transaction(String),

    #[error("bus is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BusError>;

/// Raw i2c transport: 7-bit addressed write and write-then-read.
pub trait I2cTransport: Send {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()>;
    fn write_read(&mut self, addr: u8, out: &[u8], input: &mut [u8]) -> Result<()>;
}

impl I2cTransport for linux_embedded_hal::I2cdev {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        embedded_hal::i2c::I2c::write(self, addr, bytes)
            .map_err(|e| BusError::Transaction(format!("{e:?}")))
    }

    fn write_read(&mut self, addr: u8, out: &[u8], input: &mut [u8]) -> Result<()> {
        embedded_hal::i2c::I2c::write_read(self, addr, out, input)
            .map_err(|e| BusError::Transaction(format!("{e:?}")))
    }
}

struct Slot<T> {
    // Taken while a guard is outstanding; None + closed after close().
    transport: Option<T>,
    closed: bool,
}

struct Inner<T> {
    slot: Mutex<Slot<T>>,
    freed: Condvar,
}

/// Cloneable handle to a transport that only one holder may touch at a time.
pub struct SharedBus<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for SharedBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: I2cTransport> SharedBus<T> {
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                slot: Mutex::new(Slot {
                    transport: Some(transport),
                    closed: false,
                }),
                freed: Condvar::new(),
            }),
        }
    }

    /// Block until exclusive access is granted or `timeout` expires.
    ///
    /// The returned guard is the only way to reach the transport; dropping it
    /// releases the bus and wakes one waiter.
    pub fn acquire(&self, timeout: Duration) -> Result<BusGuard<'_, T>> {
        let start = Instant::now();
        let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if slot.closed {
                return Err(BusError::Closed);
            }
            if let Some(transport) = slot.transport.take() {
                return Ok(BusGuard {
                    transport: Some(transport),
                    bus: self,
                });
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(BusError::Acquisition(timeout));
            }
            let (reacquired, _) = self
                .inner
                .freed
                .wait_timeout(slot, timeout - elapsed)
                .unwrap_or_else(PoisonError::into_inner);
            slot = reacquired;
        }
    }

    /// Permanently release the underlying transport resource.
    ///
    /// Waiters and later acquires fail with [`BusError::Closed`].
    pub fn close(&self) {
        let mut slot = self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.closed = true;
        slot.transport = None;
        drop(slot);
        debug!("bus closed");
        self.inner.freed.notify_all();
    }
}

/// Exclusive access to the bus transport for the lifetime of the guard.
pub struct BusGuard<'a, T> {
    transport: Option<T>,
    bus: &'a SharedBus<T>,
}

impl<T: I2cTransport> BusGuard<'_, T> {
    pub fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<()> {
        match self.transport.as_mut() {
            Some(transport) => transport.write(addr, bytes),
            None => Err(BusError::Closed),
        }
    }

    pub fn write_read(&mut self, addr: u8, out: &[u8], input: &mut [u8]) -> Result<()> {
        match self.transport.as_mut() {
            Some(transport) => transport.write_read(addr, out, input),
            None => Err(BusError::Closed),
        }
    }
}

impl<T> Drop for BusGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(transport) = self.transport.take() {
            let mut slot = self
                .bus
                .inner
                .slot
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            // A close() while we held the bus wins: the transport is dropped.
            if !slot.closed {
                slot.transport = Some(transport);
            }
            drop(slot);
            self.bus.inner.freed.notify_one();
        }
    }
}

/// In-memory stand-in for the motor module chip, used by unit tests across
/// the motor modules: a plain register file addressed as `[reg]` /
/// `[reg, value]`, shared so tests can inspect state the driver wrote.
#[cfg(test)]
pub(crate) mod fake {
    use std::sync::{Arc, Mutex, PoisonError};

    use super::{BusError, I2cTransport, Result};

    #[derive(Clone)]
    pub(crate) struct FakeChip {
        regs: Arc<Mutex<[u8; 256]>>,
    }

    impl FakeChip {
        pub(crate) fn new() -> Self {
            Self {
                regs: Arc::new(Mutex::new([0; 256])),
            }
        }

        pub(crate) fn reg(&self, addr: u8) -> u8 {
            self.regs.lock().unwrap_or_else(PoisonError::into_inner)[addr as usize]
        }

        pub(crate) fn set_reg(&self, addr: u8, value: u8) {
            self.regs.lock().unwrap_or_else(PoisonError::into_inner)[addr as usize] = value;
        }
    }

    impl I2cTransport for FakeChip {
        fn write(&mut self, _addr: u8, bytes: &[u8]) -> Result<()> {
            match bytes {
                [reg, value] => {
                    self.set_reg(*reg, *value);
                    Ok(())
                }
                _ => Err(BusError::Transaction(format!(
                    "unexpected write shape: {bytes:02X?}"
                ))),
            }
        }

        fn write_read(&mut self, _addr: u8, out: &[u8], input: &mut [u8]) -> Result<()> {
            match (out, &mut *input) {
                ([reg], [byte]) => {
                    *byte = self.reg(*reg);
                    Ok(())
                }
                _ => Err(BusError::Transaction(format!(
                    "unexpected write_read shape: {out:02X?}"
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::fake::FakeChip;
    use super::*;

    #[test]
    fn test_acquire_release_cycle() {
        let bus = SharedBus::new(FakeChip::new());
        let guard = bus.acquire(Duration::from_millis(10)).unwrap();
        drop(guard);
        // Released by the drop, so a second acquire succeeds immediately.
        bus.acquire(Duration::from_millis(10)).unwrap();
    }

    #[test]
    fn test_acquire_times_out_while_held() {
        let bus = SharedBus::new(FakeChip::new());
        let _held = bus.acquire(Duration::from_millis(10)).unwrap();

        let other = bus.clone();
        let result = thread::spawn(move || {
            other
                .acquire(Duration::from_millis(20))
                .map(|_| ())
                .unwrap_err()
        })
        .join()
        .unwrap();
        assert!(matches!(result, BusError::Acquisition(_)));
    }

    #[test]
    fn test_acquire_blocks_until_released() {
        let bus = SharedBus::new(FakeChip::new());
        let held = bus.acquire(Duration::from_millis(10)).unwrap();

        let other = bus.clone();
        let waiter = thread::spawn(move || {
            other.acquire(Duration::from_millis(500)).map(|_| ()).is_ok()
        });
        thread::sleep(Duration::from_millis(30));
        drop(held);
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_closed_bus_rejects_acquire() {
        let bus = SharedBus::new(FakeChip::new());
        bus.close();
        let err = bus.acquire(Duration::from_millis(10)).map(|_| ()).unwrap_err();
        assert!(matches!(err, BusError::Closed));
    }

    #[test]
    fn test_close_wakes_waiters() {
        let bus = SharedBus::new(FakeChip::new());
        let _held = bus.acquire(Duration::from_millis(10)).unwrap();

        let other = bus.clone();
        let waiter = thread::spawn(move || {
            other
                .acquire(Duration::from_secs(5))
                .map(|_| ())
                .unwrap_err()
        });
        thread::sleep(Duration::from_millis(30));
        bus.close();
        assert!(matches!(waiter.join().unwrap(), BusError::Closed));
    }

    #[test]
    fn test_guard_reaches_transport() {
        let chip = FakeChip::new();
        let bus = SharedBus::new(chip.clone());
        let mut guard = bus.acquire(Duration::from_millis(10)).unwrap();
        guard.write(0x0F, &[0x14, 0xA5]).unwrap();

        let mut buf = [0u8; 1];
        guard.write_read(0x0F, &[0x14], &mut buf).unwrap();
        assert_eq!(buf[0], 0xA5);
        assert_eq!(chip.reg(0x14), 0xA5);
    }
}
