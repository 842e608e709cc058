//! Loaded module (debug image) discovery.
//!
//! The engine reports the binaries mapped into the process as a list of
//! objects with the keys `image_addr`, `image_size`, `code_file`, `type`,
//! `debug_id`, `code_id` and, when known, `debug_file`. The list is computed
//! once and cached until [`clear_modulecache`] is called.
//!
//! Discovery goes through a [`ModuleFinder`]; the default one reads
//! `/proc/self/maps` and pulls GNU build ids out of each mapped ELF file.

use crate::value::Value;
use goblin::elf::note::NT_GNU_BUILD_ID;
use goblin::elf::Elf;
use memmap2::Mmap;
use parking_lot::{const_mutex, const_rwlock, Mutex, RwLock};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

static FINDER: RwLock<Option<Arc<dyn ModuleFinder>>> = const_rwlock(None);
static CACHE: Mutex<Option<Value>> = const_mutex(None);

/// Produces the module list.
pub trait ModuleFinder: Send + Sync {
    /// Returns the current module list. Anything other than a list is
    /// passed through to callers unchanged.
    fn modules(&self) -> Value;
}

/// Installs `finder` as the module source and drops the cached list.
pub fn set_module_finder(finder: Arc<dyn ModuleFinder>) {
    *FINDER.write() = Some(finder);
    clear_modulecache();
}

/// Restores the default `/proc/self/maps` finder and drops the cached list.
pub fn clear_module_finder() {
    *FINDER.write() = None;
    clear_modulecache();
}

/// Returns the module list, computing it on first use.
pub fn get_modules_list() -> Value {
    let mut cache = CACHE.lock();
    if let Some(list) = cache.as_ref() {
        return list.clone();
    }

    let finder = FINDER.read().clone();
    let list = match finder {
        Some(finder) => finder.modules(),
        None => ProcMapsFinder::default().modules(),
    };
    debug!(count = list.len(), "computed module list");
    *cache = Some(list.clone());
    list
}

/// Drops the cached module list so the next request recomputes it.
pub fn clear_modulecache() {
    *CACHE.lock() = None;
}

/// Finds modules from a Linux `maps` file.
#[derive(Debug, Clone)]
pub struct ProcMapsFinder {
    maps_path: PathBuf,
}

impl Default for ProcMapsFinder {
    fn default() -> Self {
        Self::new("/proc/self/maps")
    }
}

impl ProcMapsFinder {
    /// Creates a finder reading `maps_path`.
    pub fn new(maps_path: impl Into<PathBuf>) -> Self {
        Self {
            maps_path: maps_path.into(),
        }
    }
}

impl ModuleFinder for ProcMapsFinder {
    fn modules(&self) -> Value {
        let maps = match std::fs::read_to_string(&self.maps_path) {
            Ok(maps) => maps,
            Err(error) => {
                debug!(path = %self.maps_path.display(), %error, "cannot read module maps");
                return Value::new_list();
            }
        };

        let mut list = Value::new_list();
        for range in merge_mappings(&maps) {
            // Data files mapped into memory are not modules.
            let Some(build_id) = read_build_id(Path::new(&range.path)) else {
                continue;
            };
            list.append(range.into_image(build_id.as_deref()));
        }
        list
    }
}

/// One file's address range, merged over all of its mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MappedRange {
    path: String,
    start: u64,
    end: u64,
}

impl MappedRange {
    fn into_image(self, build_id: Option<&[u8]>) -> Value {
        let mut image = Value::new_object();
        image.set_by_key("type", Value::new_string("elf"));
        image.set_by_key("image_addr", Value::new_string(format!("0x{:x}", self.start)));
        let size = i32::try_from(self.end - self.start).unwrap_or(i32::MAX);
        image.set_by_key("image_size", Value::new_int32(size));
        image.set_by_key("code_file", Value::new_string(self.path));
        if let Some(build_id) = build_id.filter(|id| !id.is_empty()) {
            image.set_by_key("code_id", Value::new_string(hex(build_id)));
            image.set_by_key("debug_id", Value::new_string(debug_id(build_id)));
        }
        image
    }
}

/// Parses `maps` lines and merges mappings of the same file, keeping the
/// order in which files first appear.
fn merge_mappings(maps: &str) -> Vec<MappedRange> {
    let mut ranges: Vec<MappedRange> = Vec::new();
    for line in maps.lines() {
        let mut fields = line.splitn(6, ' ');
        let Some((start, end)) = fields.next().and_then(|r| r.split_once('-')) else {
            continue;
        };
        let (Ok(start), Ok(end)) = (u64::from_str_radix(start, 16), u64::from_str_radix(end, 16))
        else {
            continue;
        };
        let path = fields.nth(4).map(str::trim).unwrap_or("");
        if !path.starts_with('/') || path.ends_with("(deleted)") {
            continue;
        }

        match ranges.iter_mut().find(|r| r.path == path) {
            Some(range) => {
                range.start = range.start.min(start);
                range.end = range.end.max(end);
            }
            None => ranges.push(MappedRange {
                path: path.to_string(),
                start,
                end,
            }),
        }
    }
    ranges
}

/// Reads the GNU build id of an ELF file.
///
/// Returns `None` when the file is not a readable ELF image, and
/// `Some(None)` for an ELF image without a build id note.
fn read_build_id(path: &Path) -> Option<Option<Vec<u8>>> {
    let file = File::open(path).ok()?;
    // SAFETY: the mapping is read-only and only lives for this call. The
    // file is a loaded image, which the loader itself maps the same way.
    #[allow(unsafe_code)]
    let map = unsafe { Mmap::map(&file) }.ok()?;
    let elf = Elf::parse(&map).ok()?;

    let from_headers = elf.iter_note_headers(&map).and_then(|mut notes| {
        notes
            .find_map(|note| note.ok().filter(|n| n.n_type == NT_GNU_BUILD_ID))
            .map(|note| note.desc.to_vec())
    });
    let build_id = from_headers.or_else(|| {
        elf.iter_note_sections(&map, None).and_then(|mut notes| {
            notes
                .find_map(|note| note.ok().filter(|n| n.n_type == NT_GNU_BUILD_ID))
                .map(|note| note.desc.to_vec())
        })
    });
    Some(build_id)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Debug id derived from a build id: the first 16 bytes read as a
/// little-endian GUID, zero padded when the build id is shorter.
fn debug_id(build_id: &[u8]) -> String {
    let mut bytes = [0u8; 16];
    let len = build_id.len().min(16);
    bytes[..len].copy_from_slice(&build_id[..len]);
    Uuid::from_bytes_le(bytes).hyphenated().to_string()
}
