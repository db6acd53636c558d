use std::sync::atomic::{AtomicBool, Ordering};

/**
 * Building-wide stop signal.
 *
 * Every actor checks the token each time it wakes from a blocking wait. Triggering it alone
 * does not wake anybody; the owner of a monitor must broadcast on it afterwards.
 */
#[derive(Debug, Default)]
pub struct Shutdown {
    flag: AtomicBool,
}

impl Shutdown {
    pub fn new() -> Shutdown {
        Shutdown {
            flag: AtomicBool::new(false),
        }
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
