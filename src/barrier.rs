//! Ordered completion barrier.
//!
//! Workers finish in any order, but results are handed out strictly by slot
//! index. Every slot is written at most once; the reader waits on slot `i`
//! before it looks at slot `i + 1`.

use tokio::sync::oneshot;

/// Creates `len` write-once slots and the reader that drains them in order.
pub fn ordered_slots<T>(len: usize) -> (Vec<Slot<T>>, OrderedSlots<T>) {
    let mut slots = Vec::with_capacity(len);
    let mut receivers = Vec::with_capacity(len);
    for index in 0..len {
        let (sender, receiver) = oneshot::channel();
        slots.push(Slot { index, sender });
        receivers.push(receiver);
    }
    (
        slots,
        OrderedSlots {
            receivers: receivers.into_iter(),
            next_index: 0,
        },
    )
}

/// Write half of a single slot. Filling consumes it.
#[derive(Debug)]
pub struct Slot<T> {
    index: usize,
    sender: oneshot::Sender<T>,
}

impl<T> Slot<T> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fill(self, value: T) {
        // The reader may already be gone, in which case nobody wants the value.
        let _ = self.sender.send(value);
    }
}

#[derive(Debug)]
pub struct OrderedSlots<T> {
    receivers: std::vec::IntoIter<oneshot::Receiver<T>>,
    next_index: usize,
}

impl<T> OrderedSlots<T> {
    /// Waits for the next slot in index order.
    ///
    /// Yields `Err(index)` when that slot was dropped without being filled,
    /// and `None` once every slot has been read.
    pub async fn next(&mut self) -> Option<std::result::Result<T, usize>> {
        let receiver = self.receivers.next()?;
        let index = self.next_index;
        self.next_index += 1;
        Some(receiver.await.map_err(|_| index))
    }

    pub fn remaining(&self) -> usize {
        self.receivers.len()
    }
}
