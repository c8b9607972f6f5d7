//! Append-only CSV audit sheets, one file per sheet inside an audit directory.

use std::{
	fs::{self, File, OpenOptions},
	path::{Path, PathBuf},
	sync::Mutex,
};

use csv::{ReaderBuilder, Writer, WriterBuilder};

use crate::{Error, Result};

pub struct AuditSheet {
	path: PathBuf,
	writer: Mutex<Writer<File>>,
}
impl AuditSheet {
	/// Opens `<dir>/<name>.csv` for appending, writing `header` only when the file is new or empty.
	/// An existing sheet with a different header is rejected.
	pub fn open(dir: &Path, name: &str, header: &[&str]) -> Result<Self> {
		fs::create_dir_all(dir)?;

		let path = dir.join(format!("{name}.csv"));
		let is_new = fs::metadata(&path).map(|meta| meta.len() == 0).unwrap_or(true);

		if !is_new {
			let mut reader = ReaderBuilder::new().has_headers(true).from_path(&path)?;
			let existing = reader.headers()?;

			if !existing.iter().eq(header.iter().copied()) {
				return Err(Error::InvalidArgument(format!(
					"Audit sheet {} has a different header.",
					path.display()
				)));
			}
		}

		let file = OpenOptions::new().create(true).append(true).open(&path)?;
		let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

		if is_new {
			writer.write_record(header)?;
			writer.flush()?;
		}

		Ok(Self { path, writer: Mutex::new(writer) })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Writes and flushes one row.
	pub fn append<I, T>(&self, row: I) -> Result<()>
	where
		I: IntoIterator<Item = T>,
		T: AsRef<[u8]>,
	{
		let mut writer = self.writer.lock().unwrap_or_else(|err| err.into_inner());

		writer.write_record(row)?;
		writer.flush()?;

		Ok(())
	}
}
