use std::{fs::File, io::{self, Seek}};

#[cfg(test)]
pub fn init_test_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// Get the length of the file, by querying metadata and as a last resort seeking to the end of the file and getting the offset
pub fn file_len(file: &mut File) -> Result<u64, io::Error> {
	if let Ok(metadata) = file.metadata() {
		Ok(metadata.len())
	} else {
		let size = file.seek(io::SeekFrom::End(0))?;
		file.seek(io::SeekFrom::Start(0))?;
		Ok(size)
	}
}

/// Counts how many times each byte value occurs in `bytes`
pub fn byte_histogram(bytes: &[u8]) -> [u64; 256] {
	let mut histogram = [0; 256];
	for &b in bytes {
		histogram[b as usize] += 1;
	}
	histogram
}

/// Returns the byte values that never occur in `bytes`, in ascending order. A sanity check that a generator isn't obviously
/// degenerate - For a large enough sample of any reasonable generator, this is empty
pub fn missing_byte_values(bytes: &[u8]) -> Vec<u8> {
	byte_histogram(bytes).iter()
		.enumerate()
		.filter(|(_, count)| **count == 0)
		.map(|(value, _)| value as u8)
		.collect()
}
