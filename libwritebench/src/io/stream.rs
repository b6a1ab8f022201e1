use std::{fs::File, io::{self, BufWriter, Write}, path::Path, time::Instant};

use log::debug;

use super::WriteOutcome;

/// Writes `bytes` through a buffered stream, start to end. The file is not pre-sized - It grows with the stream
pub fn write_stream(path: impl AsRef<Path>, bytes: &[u8]) -> WriteOutcome {
	let path = path.as_ref();
	let start = Instant::now();

	let res = (|| -> Result<(), io::Error> {
		let mut writer = BufWriter::new(File::create(path)?);
		writer.write_all(bytes)?;
		writer.flush()
	})();

	debug!("Stream write of {} bytes to \"{}\" took {:?}", bytes.len(), path.display(), start.elapsed());

	match res {
		Ok(()) => WriteOutcome::new(path, Vec::new()),
		Err(e) => WriteOutcome::failed(path, e)
	}
}
