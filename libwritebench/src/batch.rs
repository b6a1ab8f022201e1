use std::ops::Range;

use crate::error::Error;

/// A half-open range `[start, end)` of byte indices that one task owns exclusively
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
	pub start: usize,
	pub end: usize
}

impl Batch {
	pub fn new(start: usize, end: usize) -> Self {
		Batch { start, end }
	}

	pub fn len(&self) -> usize {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.start == self.end
	}

	pub fn range(&self) -> Range<usize> {
		self.start..self.end
	}
}

/// Divides `[0, total_size)` into contiguous, non-overlapping batches of `total_size / worker_count` bytes each,
/// the last of which takes whatever is left over (so there may be `worker_count + 1` batches).
///
/// Always returns at least one batch. If `total_size` is 0, that is the empty batch `[0, 0)`. If there are more workers
/// than bytes, the whole range is a single batch
pub fn plan(total_size: usize, worker_count: usize) -> Vec<Batch> {
	let batch_size = match total_size / worker_count.max(1) {
		0 => total_size,
		batch_size => batch_size
	};

	let mut batches = Vec::with_capacity(total_size.checked_div(batch_size).unwrap_or(0) + 1);
	let mut start = 0;
	loop {
		let end = (start + batch_size).min(total_size);
		batches.push(Batch::new(start, end));
		if end == total_size {
			break;
		}
		start = end;
	}

	batches
}

/// Checks that `batches` partition `[0, len)` exactly - They must start at 0, be contiguous and end at `len`
pub fn check_partition(batches: &[Batch], len: usize) -> Result<(), Error> {
	let mut expected_start = 0;
	for batch in batches {
		if batch.start != expected_start || batch.end < batch.start {
			return Err(Error::BatchLayout(format!("batch {:?} does not start at {}", batch, expected_start)));
		}
		expected_start = batch.end;
	}

	if expected_start != len {
		return Err(Error::BatchLayout(format!("batches cover [0, {}) but the buffer is {} bytes", expected_start, len)));
	}

	Ok(())
}

/// Splits `buf` into the disjoint mutable sub-slices described by `batches`, pairing each with its batch.
///
/// Returns an error if the batches do not partition the buffer
pub fn split_mut<'a>(buf: &'a mut [u8], batches: &[Batch]) -> Result<Vec<(Batch, &'a mut [u8])>, Error> {
	check_partition(batches, buf.len())?;

	let mut rest = buf;
	let mut parts = Vec::with_capacity(batches.len());
	for batch in batches {
		let (part, tail) = rest.split_at_mut(batch.len());
		parts.push((*batch, part));
		rest = tail;
	}

	Ok(parts)
}

#[cfg(test)]
mod test {
	use super::{plan, split_mut, Batch};

	fn assert_partitions(batches: &[Batch], total_size: usize) {
		assert!(!batches.is_empty());
		assert_eq!(batches[0].start, 0);
		assert_eq!(batches[batches.len() - 1].end, total_size);
		for pair in batches.windows(2) {
			assert_eq!(pair[0].end, pair[1].start);
		}
		assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), total_size);
	}

	#[test]
	fn test_plan_partitions() {
		for total_size in [0, 1, 2, 7, 10, 99, 100, 101, 4096, 1_000_003] {
			for worker_count in 1..=17 {
				let batches = plan(total_size, worker_count);
				assert_partitions(&batches, total_size);
			}
		}
	}

	#[test]
	fn test_plan_even_split() {
		let batches = plan(100, 4);

		assert_eq!(batches, vec![ Batch::new(0, 25), Batch::new(25, 50), Batch::new(50, 75), Batch::new(75, 100) ]);
	}

	#[test]
	fn test_plan_uneven_split() {
		// 10 / 3 = 3, so there's a short trailing batch
		let batches = plan(10, 3);

		assert_eq!(batches, vec![ Batch::new(0, 3), Batch::new(3, 6), Batch::new(6, 9), Batch::new(9, 10) ]);
		assert_eq!(batches.len(), 10usize.div_ceil(3));
	}

	#[test]
	fn test_plan_empty() {
		assert_eq!(plan(0, 1), vec![ Batch::new(0, 0) ]);
		assert_eq!(plan(0, 8), vec![ Batch::new(0, 0) ]);
	}

	#[test]
	fn test_plan_more_workers_than_bytes() {
		assert_eq!(plan(3, 8), vec![ Batch::new(0, 3) ]);
	}

	#[test]
	fn test_plan_zero_workers_is_one() {
		assert_eq!(plan(5, 0), vec![ Batch::new(0, 5) ]);
	}

	#[test]
	fn test_split_mut() {
		let mut buf: Vec<u8> = (0..10).collect();
		let batches = plan(buf.len(), 3);

		let parts = split_mut(&mut buf, &batches).unwrap();

		let expected: &[&[u8]] = &[ &[0, 1, 2], &[3, 4, 5], &[6, 7, 8], &[9] ];
		assert_eq!(parts.len(), expected.len());
		for ((batch, part), expected) in parts.iter().zip(expected) {
			assert_eq!(part, expected);
			assert_eq!(batch.len(), part.len());
		}
	}

	#[test]
	fn test_split_mut_rejects_bad_layouts() {
		let mut buf = vec![0u8; 10];

		// Gap
		assert!(split_mut(&mut buf, &[ Batch::new(0, 4), Batch::new(5, 10) ]).is_err());
		// Overlap
		assert!(split_mut(&mut buf, &[ Batch::new(0, 6), Batch::new(5, 10) ]).is_err());
		// Too short
		assert!(split_mut(&mut buf, &[ Batch::new(0, 9) ]).is_err());
		// Too long
		assert!(split_mut(&mut buf, &[ Batch::new(0, 11) ]).is_err());
	}
}
