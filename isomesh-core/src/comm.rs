//! Message passing between mesh partitions
//!
//! The extraction engine runs identically on every partition of a
//! decomposed mesh. Partitions talk through the [`Communicator`] trait:
//! buffered point-to-point sends, blocking receives and an all-reduce.
//! [`SerialCommunicator`] covers the undecomposed case and
//! [`ChannelCommunicator`] runs a whole cluster inside one process.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::time::Duration;

/// Identifies the exchange a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageTag {
    PatchInfo,
    FieldValues,
    CutTypes,
    CellSnaps,
    PointSnaps,
    Reduce,
}

/// A tagged buffer of `f64` values
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub tag: MessageTag,
    pub data: Vec<f64>,
}

impl Message {
    pub fn new(tag: MessageTag, data: Vec<f64>) -> Self {
        Self { tag, data }
    }
}

/// Combine operation for [`Communicator::all_reduce`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    /// Element-wise minimum
    Min,
    /// Rows of `stride` values; keep the lexicographically smaller row
    LexicographicMin { stride: usize },
}

impl ReduceOp {
    /// Fold `other` into `acc`
    pub fn combine(&self, acc: &mut [f64], other: &[f64]) -> Result<()> {
        if acc.len() != other.len() {
            return Err(Error::ParallelDesync(format!(
                "reduction over {} values received {}",
                acc.len(),
                other.len()
            )));
        }
        match *self {
            ReduceOp::Min => {
                for (a, &b) in acc.iter_mut().zip(other) {
                    if b < *a {
                        *a = b;
                    }
                }
            }
            ReduceOp::LexicographicMin { stride } => {
                if stride == 0 || acc.len() % stride != 0 {
                    return Err(Error::ParallelDesync(format!(
                        "{} values do not form rows of {}",
                        acc.len(),
                        stride
                    )));
                }
                for (a, b) in acc.chunks_exact_mut(stride).zip(other.chunks_exact(stride)) {
                    if lexicographic_cmp(b, a) == Ordering::Less {
                        a.copy_from_slice(b);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Total lexicographic order on rows of floats
pub fn lexicographic_cmp(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.total_cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Collective communication between mesh partitions
pub trait Communicator {
    /// Index of this partition
    fn rank(&self) -> usize;

    /// Number of partitions
    fn size(&self) -> usize;

    /// Buffered send; never blocks
    fn send(&self, neighbour: usize, message: Message) -> Result<()>;

    /// Blocking receive of the next message from `neighbour`, which must
    /// carry `tag`
    fn receive(&self, neighbour: usize, tag: MessageTag) -> Result<Vec<f64>>;

    /// Combine `values` over all partitions; every partition gets the result
    fn all_reduce(&self, values: Vec<f64>, op: ReduceOp) -> Result<Vec<f64>>;
}

/// Communicator for an undecomposed mesh
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn send(&self, neighbour: usize, _message: Message) -> Result<()> {
        Err(Error::Communication(format!(
            "serial run has no partition {} to send to",
            neighbour
        )))
    }

    fn receive(&self, neighbour: usize, _tag: MessageTag) -> Result<Vec<f64>> {
        Err(Error::Communication(format!(
            "serial run has no partition {} to receive from",
            neighbour
        )))
    }

    fn all_reduce(&self, values: Vec<f64>, _op: ReduceOp) -> Result<Vec<f64>> {
        Ok(values)
    }
}

/// In-process communicator: one `flume` channel per ordered pair of ranks
#[derive(Debug, Clone)]
pub struct ChannelCommunicator {
    rank: usize,
    size: usize,
    senders: Vec<flume::Sender<Message>>,
    receivers: Vec<flume::Receiver<Message>>,
    timeout: Option<Duration>,
}

impl ChannelCommunicator {
    /// Create the communicators of a `size`-rank cluster, indexed by rank
    pub fn cluster(size: usize) -> Vec<ChannelCommunicator> {
        let channels: Vec<Vec<(flume::Sender<Message>, flume::Receiver<Message>)>> = (0..size)
            .map(|_| (0..size).map(|_| flume::unbounded()).collect())
            .collect();

        (0..size)
            .map(|rank| ChannelCommunicator {
                rank,
                size,
                senders: (0..size).map(|dst| channels[rank][dst].0.clone()).collect(),
                receivers: (0..size).map(|src| channels[src][rank].1.clone()).collect(),
                timeout: None,
            })
            .collect()
    }

    /// Fail receives that wait longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn check_rank(&self, other: usize) -> Result<()> {
        if other >= self.size || other == self.rank {
            return Err(Error::Communication(format!(
                "rank {} cannot address rank {} in a cluster of {}",
                self.rank, other, self.size
            )));
        }
        Ok(())
    }
}

impl Communicator for ChannelCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, neighbour: usize, message: Message) -> Result<()> {
        self.check_rank(neighbour)?;
        tracing::trace!(
            from = self.rank,
            to = neighbour,
            tag = ?message.tag,
            len = message.data.len(),
            "send"
        );
        self.senders[neighbour]
            .send(message)
            .map_err(|_| Error::Communication(format!("rank {} has disconnected", neighbour)))
    }

    fn receive(&self, neighbour: usize, tag: MessageTag) -> Result<Vec<f64>> {
        self.check_rank(neighbour)?;
        let receiver = &self.receivers[neighbour];
        let message = match self.timeout {
            Some(timeout) => receiver.recv_timeout(timeout).map_err(|e| {
                Error::Communication(format!(
                    "rank {} receiving from {}: {}",
                    self.rank, neighbour, e
                ))
            })?,
            None => receiver
                .recv()
                .map_err(|_| Error::Communication(format!("rank {} has disconnected", neighbour)))?,
        };

        if message.tag != tag {
            return Err(Error::ParallelDesync(format!(
                "rank {} expected {:?} from rank {}, received {:?}",
                self.rank, tag, neighbour, message.tag
            )));
        }
        Ok(message.data)
    }

    fn all_reduce(&self, mut values: Vec<f64>, op: ReduceOp) -> Result<Vec<f64>> {
        if self.size == 1 {
            return Ok(values);
        }

        if self.rank == 0 {
            // Combine in rank order so every run reduces identically
            for src in 1..self.size {
                let other = self.receive(src, MessageTag::Reduce)?;
                op.combine(&mut values, &other)?;
            }
            for dst in 1..self.size {
                self.send(dst, Message::new(MessageTag::Reduce, values.clone()))?;
            }
            Ok(values)
        } else {
            let len = values.len();
            self.send(0, Message::new(MessageTag::Reduce, values))?;
            let result = self.receive(0, MessageTag::Reduce)?;
            if result.len() != len {
                return Err(Error::ParallelDesync(format!(
                    "reduction of {} values returned {}",
                    len,
                    result.len()
                )));
            }
            Ok(result)
        }
    }
}
