use anyhow::{Context, Result, anyhow, bail};
use core_foundation::base::TCFType;
use core_foundation::runloop::{CFRunLoop, CFRunLoopSource, kCFRunLoopDefaultMode};
use core_foundation_sys::dictionary::{CFDictionaryRef, CFMutableDictionaryRef};
use core_foundation_sys::runloop::CFRunLoopSourceRef;
use libc::{c_char, c_int, c_void, mach_port_t};
use std::ffi::CStr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::preferences::EventKind;
use crate::system::{BatchCallback, DeviceHandle, DeviceIterator, DeviceNotificationInterface};

type IoObject = mach_port_t;
type IoIterator = IoObject;
type IONotificationPortRef = *mut c_void;
type IOServiceMatchingCallback = extern "C" fn(refcon: *mut c_void, iterator: IoIterator);

const K_IO_MAIN_PORT_DEFAULT: mach_port_t = 0;
const KERN_SUCCESS: c_int = 0;

const USB_DEVICE_CLASS: &CStr = c"IOUSBHostDevice";
const FIRST_MATCH_NOTIFICATION: &CStr = c"IOServiceFirstMatch";
const TERMINATED_NOTIFICATION: &CStr = c"IOServiceTerminate";

#[link(name = "IOKit", kind = "framework")]
unsafe extern "C" {
    fn IONotificationPortCreate(main_port: mach_port_t) -> IONotificationPortRef;
    fn IONotificationPortDestroy(notify: IONotificationPortRef);
    fn IONotificationPortGetRunLoopSource(notify: IONotificationPortRef) -> CFRunLoopSourceRef;
    fn IOServiceMatching(name: *const c_char) -> CFMutableDictionaryRef;
    fn IOServiceAddMatchingNotification(
        notify_port: IONotificationPortRef,
        notification_type: *const c_char,
        matching: CFDictionaryRef,
        callback: IOServiceMatchingCallback,
        ref_con: *mut c_void,
        notification: *mut IoIterator,
    ) -> c_int;
    fn IOIteratorNext(iterator: IoIterator) -> IoObject;
    fn IOObjectRelease(object: IoObject) -> c_int;
}

/// Refcon handed to IOKit; must outlive the notification port
struct NotificationContext {
    kind: EventKind,
    callback: BatchCallback,
}

struct Subscription {
    context: Box<NotificationContext>,
    iterator: IoIterator,
}

/// One wake-up's worth of matched services
struct IoKitBatch {
    iterator: IoIterator,
}

impl DeviceIterator for IoKitBatch {
    fn next_device(&mut self) -> Option<DeviceHandle> {
        let device = unsafe { IOIteratorNext(self.iterator) };
        (device != 0).then_some(DeviceHandle(device))
    }

    fn release(&mut self, device: DeviceHandle) {
        unsafe {
            IOObjectRelease(device.0);
        }
    }
}

struct RunLoopHandle(CFRunLoop);

// SAFETY: the handle is only used to call CFRunLoopStop, which is thread-safe
unsafe impl Send for RunLoopHandle {}

struct NotificationThread {
    run_loop: RunLoopHandle,
    stopping: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Production implementation of DeviceNotificationInterface using IOKit matching
/// notifications on a dedicated run-loop thread
#[derive(Default)]
pub struct IoKitNotifications {
    worker: Option<NotificationThread>,
}

impl IoKitNotifications {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeviceNotificationInterface for IoKitNotifications {
    fn register(&mut self, callback: BatchCallback) -> Result<()> {
        if self.worker.is_some() {
            bail!("USB device notifications are already registered");
        }

        info!("Registering IOKit notifications for {:?}", USB_DEVICE_CLASS);

        let stopping = Arc::new(AtomicBool::new(false));
        let thread_stopping = Arc::clone(&stopping);
        let (ready_tx, ready_rx) = mpsc::channel();

        let thread = thread::Builder::new()
            .name("usb-notifications".to_string())
            .spawn(move || run_notification_thread(callback, thread_stopping, ready_tx))
            .context("Failed to spawn USB notification thread")?;

        match ready_rx.recv() {
            Ok(Ok(run_loop)) => {
                self.worker = Some(NotificationThread {
                    run_loop,
                    stopping,
                    thread,
                });
                info!("IOKit notifications registered successfully");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(anyhow!("USB notification thread exited during registration"))
            }
        }
    }

    fn unregister(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.take() {
            info!("Removing IOKit notifications");
            worker.stopping.store(true, Ordering::SeqCst);
            worker.run_loop.0.stop();
            worker
                .thread
                .join()
                .map_err(|_| anyhow!("USB notification thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for IoKitNotifications {
    fn drop(&mut self) {
        if let Err(e) = self.unregister() {
            warn!("Failed to remove IOKit notifications: {}", e);
        }
    }
}

fn run_notification_thread(
    callback: BatchCallback,
    stopping: Arc<AtomicBool>,
    ready: mpsc::Sender<Result<RunLoopHandle>>,
) {
    let port = unsafe { IONotificationPortCreate(K_IO_MAIN_PORT_DEFAULT) };
    if port.is_null() {
        let _ = ready.send(Err(anyhow!("IONotificationPortCreate returned null")));
        return;
    }

    let mut subscriptions = Vec::with_capacity(EventKind::ALL.len());
    for kind in EventKind::ALL {
        let context = Box::new(NotificationContext {
            kind,
            callback: Arc::clone(&callback),
        });

        match unsafe { add_matching_notification(port, &context) } {
            Ok(iterator) => subscriptions.push(Subscription { context, iterator }),
            Err(e) => {
                release_subscriptions(port, subscriptions);
                let _ = ready.send(Err(e));
                return;
            }
        }
    }

    let run_loop = CFRunLoop::get_current();
    unsafe {
        let source =
            CFRunLoopSource::wrap_under_get_rule(IONotificationPortGetRunLoopSource(port));
        run_loop.add_source(&source, kCFRunLoopDefaultMode);
    }

    // Draining the registration iterators delivers the catch-up batch and arms them
    for subscription in &subscriptions {
        let mut batch = IoKitBatch {
            iterator: subscription.iterator,
        };
        (subscription.context.callback)(subscription.context.kind, &mut batch);
    }

    if ready.send(Ok(RunLoopHandle(run_loop.clone()))).is_err() {
        release_subscriptions(port, subscriptions);
        return;
    }

    debug!("USB notification run loop started");
    while !stopping.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, Duration::from_secs(1), false);
        }
    }

    release_subscriptions(port, subscriptions);
    debug!("USB notification run loop exited");
}

/// # Safety
/// `port` must be a live notification port and `context` must outlive it.
unsafe fn add_matching_notification(
    port: IONotificationPortRef,
    context: &NotificationContext,
) -> Result<IoIterator> {
    let notification_type = match context.kind {
        EventKind::Connect => FIRST_MATCH_NOTIFICATION,
        EventKind::Disconnect => TERMINATED_NOTIFICATION,
    };

    // IOServiceAddMatchingNotification consumes the dictionary, so each call gets its own
    let matching = unsafe { IOServiceMatching(USB_DEVICE_CLASS.as_ptr()) };
    if matching.is_null() {
        bail!("IOServiceMatching returned null for {:?}", USB_DEVICE_CLASS);
    }

    let mut iterator: IoIterator = 0;
    let result = unsafe {
        IOServiceAddMatchingNotification(
            port,
            notification_type.as_ptr(),
            matching as CFDictionaryRef,
            device_notification,
            context as *const NotificationContext as *mut c_void,
            &mut iterator,
        )
    };

    if result != KERN_SUCCESS {
        bail!(
            "IOServiceAddMatchingNotification({:?}) failed: {:#x}",
            notification_type,
            result
        );
    }
    Ok(iterator)
}

fn release_subscriptions(port: IONotificationPortRef, subscriptions: Vec<Subscription>) {
    unsafe {
        IONotificationPortDestroy(port);
        for subscription in &subscriptions {
            IOObjectRelease(subscription.iterator);
        }
    }
    // Contexts are freed only after the port can no longer call back
    drop(subscriptions);
}

// IOKit callback function
extern "C" fn device_notification(refcon: *mut c_void, iterator: IoIterator) {
    if refcon.is_null() {
        return;
    }

    let context = unsafe { &*(refcon as *const NotificationContext) };
    let mut batch = IoKitBatch { iterator };

    let handled = panic::catch_unwind(AssertUnwindSafe(|| {
        (context.callback)(context.kind, &mut batch)
    }));
    if handled.is_err() {
        error!("Panic while handling {} notification", context.kind);
    }
}
