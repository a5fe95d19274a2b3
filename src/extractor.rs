use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, warn};

use crate::{
    error::{ImportError, ImportResult},
    models::{FilmRow, PersonKind},
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExtractedNames {
    pub actors: Vec<String>,
    pub directors: Vec<String>,
}

impl ExtractedNames {
    pub fn of(&self, kind: PersonKind) -> &[String] {
        match kind {
            PersonKind::Actor => &self.actors,
            PersonKind::Director => &self.directors,
        }
    }
}

/// Splits a comma-joined name list, trimming each token and dropping empty
/// and repeated ones.
pub fn split_names(field: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in field.split(',') {
        let name = token.trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

pub fn extract_names(row: &FilmRow) -> ExtractedNames {
    ExtractedNames { actors: split_names(&row.actors), directors: split_names(&row.director) }
}

/// All films referencing one name, as read back from a segment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationGroup {
    pub name: String,
    pub film_ids: Vec<i32>,
}

/// Removes its directory when dropped, so an aborted run leaves nothing behind.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Wipes whatever a previous run left at `path` and recreates it.
    pub fn create(path: &Path) -> ImportResult<Self> {
        if path.exists() {
            warn!(path = %path.display(), "removing stale scratch directory");
            fs::remove_dir_all(path).map_err(|err| ImportError::io(path, err))?;
        }
        fs::create_dir_all(path).map_err(|err| ImportError::io(path, err))?;
        Ok(Self { path: path.to_path_buf() })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_dir_all(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove scratch directory"
                );
            }
        }
    }
}

/// A fixed set of append-only segment files with one in-memory buffer each.
/// Names are routed by a stable hash of the trimmed name. Buffers reach disk
/// only on `flush`, which the importer calls once per committed batch.
pub struct SegmentArena {
    dir: PathBuf,
    buffers: Vec<csv::Writer<Vec<u8>>>,
    pending: u64,
    written: u64,
}

impl SegmentArena {
    pub fn create(dir: PathBuf, segments: usize) -> ImportResult<Self> {
        fs::create_dir_all(&dir).map_err(|err| ImportError::io(&dir, err))?;
        let buffers = (0..segments.max(1)).map(|_| segment_buffer()).collect();
        Ok(Self { dir, buffers, pending: 0, written: 0 })
    }

    pub fn segment_for(&self, name: &str) -> usize {
        let digest = md5::compute(name.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest.0[..8]);
        (u64::from_be_bytes(prefix) % self.buffers.len() as u64) as usize
    }

    pub fn append(&mut self, name: &str, film_id: i32) -> ImportResult<()> {
        let segment = self.segment_for(name);
        self.buffers[segment].serialize((name, film_id))?;
        self.pending += 1;
        Ok(())
    }

    /// Appends every buffered record to its segment file.
    pub fn flush(&mut self) -> ImportResult<()> {
        if self.pending == 0 {
            return Ok(());
        }

        for segment in 0..self.buffers.len() {
            let buffer = std::mem::replace(&mut self.buffers[segment], segment_buffer());
            let bytes = buffer.into_inner().map_err(|err| {
                ImportError::io(self.segment_path(segment), err.into_error())
            })?;
            if bytes.is_empty() {
                continue;
            }

            let path = self.segment_path(segment);
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| ImportError::io(&path, err))?;
            file.write_all(&bytes).map_err(|err| ImportError::io(&path, err))?;
        }

        debug!(dir = %self.dir.display(), records = self.pending, "flushed relation segments");
        self.written += self.pending;
        self.pending = 0;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.written
    }

    /// Segment files that received at least one record, in segment order.
    pub fn segment_files(&self) -> Vec<PathBuf> {
        (0..self.buffers.len()).map(|s| self.segment_path(s)).filter(|p| p.exists()).collect()
    }

    fn segment_path(&self, segment: usize) -> PathBuf {
        self.dir.join(format!("{segment:05}.csv"))
    }
}

fn segment_buffer() -> csv::Writer<Vec<u8>> {
    WriterBuilder::new().has_headers(false).from_writer(Vec::new())
}

/// Groups one segment's records by name, in order of first appearance.
/// Film ids keep their insertion order with duplicates removed.
pub fn read_segment(path: &Path) -> ImportResult<Vec<RelationGroup>> {
    let file = File::open(path).map_err(|err| ImportError::io(path, err))?;
    let mut reader = ReaderBuilder::new().has_headers(false).from_reader(file);

    let mut groups: Vec<RelationGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for record in reader.deserialize::<(String, i32)>() {
        let (name, film_id) = record?;
        let slot = match index.get(&name) {
            Some(&slot) => slot,
            None => {
                groups.push(RelationGroup { name: name.clone(), film_ids: Vec::new() });
                index.insert(name, groups.len() - 1);
                groups.len() - 1
            },
        };
        let films = &mut groups[slot].film_ids;
        if !films.contains(&film_id) {
            films.push(film_id);
        }
    }
    Ok(groups)
}

/// Routes the names of each loaded film into per-kind segment arenas under
/// a scratch directory that lives exactly as long as the extractor.
pub struct RelationExtractor {
    actors: SegmentArena,
    directors: SegmentArena,
    scratch: ScratchDir,
}

impl RelationExtractor {
    pub fn create(scratch_dir: &Path, segments: usize) -> ImportResult<Self> {
        let scratch = ScratchDir::create(scratch_dir)?;
        let actors =
            SegmentArena::create(scratch.path().join(PersonKind::Actor.dir_name()), segments)?;
        let directors =
            SegmentArena::create(scratch.path().join(PersonKind::Director.dir_name()), segments)?;
        Ok(Self { actors, directors, scratch })
    }

    pub fn extract(&mut self, row: &FilmRow, film_id: i32) -> ImportResult<ExtractedNames> {
        let names = extract_names(row);
        for name in &names.actors {
            self.actors.append(name, film_id)?;
        }
        for name in &names.directors {
            self.directors.append(name, film_id)?;
        }
        Ok(names)
    }

    pub fn flush(&mut self) -> ImportResult<()> {
        self.actors.flush()?;
        self.directors.flush()
    }

    pub fn arena(&self, kind: PersonKind) -> &SegmentArena {
        match kind {
            PersonKind::Actor => &self.actors,
            PersonKind::Director => &self.directors,
        }
    }

    pub fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }
}
