//! Paged file manager: fixed-size page I/O backed by a real file, fronted
//! by an LRU cache of recently touched page buffers.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::RwLock;

/// Default page size for newly created index files.
pub const PAGE_SIZE: usize = 4096;

/// A raw, fixed-size page buffer.
#[derive(Debug, Clone)]
pub struct Page {
    pub data: Vec<u8>,
}

impl Page {
    pub fn zeroed(page_size: usize) -> Self {
        Page {
            data: vec![0u8; page_size],
        }
    }
}

/// The paged file manager contract consumed by the index handle and engine.
///
/// `GetNumberOfPages` is `num_pages`; `AppendPage` is `append_page`, which
/// allocates and zero-fills a new page at the end of the file and returns
/// its page number.
pub trait PagedFileManager {
    fn page_size(&self) -> usize;
    fn num_pages(&self) -> io::Result<u32>;
    fn read_page(&self, page_num: u32) -> io::Result<Page>;
    fn write_page(&self, page_num: u32, page: &Page) -> io::Result<()>;
    fn append_page(&self) -> io::Result<u32>;
    fn sync(&self) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct Inner {
    file: File,
    page_size: usize,
    cache: LruCache<u32, Page>,
    stats: CacheStats,
}

/// A [`PagedFileManager`] backed by a single open file, with an in-memory
/// LRU cache of recently read/written pages.
pub struct FilePagedFileManager {
    inner: Arc<RwLock<Inner>>,
}

impl FilePagedFileManager {
    /// Opens an existing file for page I/O.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize, cache_capacity: usize) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::from_file(file, page_size, cache_capacity)
    }

    /// Creates a new, empty file for page I/O. Fails if the file exists.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize, cache_capacity: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Self::from_file(file, page_size, cache_capacity)
    }

    fn from_file(file: File, page_size: usize, cache_capacity: usize) -> io::Result<Self> {
        let capacity = std::num::NonZeroUsize::new(cache_capacity.max(1)).unwrap();
        Ok(FilePagedFileManager {
            inner: Arc::new(RwLock::new(Inner {
                file,
                page_size,
                cache: LruCache::new(capacity),
                stats: CacheStats::default(),
            })),
        })
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.read().stats
    }
}

impl PagedFileManager for FilePagedFileManager {
    fn page_size(&self) -> usize {
        self.inner.read().page_size
    }

    fn num_pages(&self) -> io::Result<u32> {
        let mut inner = self.inner.write();
        let page_size = inner.page_size as u64;
        let len = inner.file.seek(SeekFrom::End(0))?;
        Ok((len / page_size) as u32)
    }

    fn read_page(&self, page_num: u32) -> io::Result<Page> {
        let mut inner = self.inner.write();
        if let Some(page) = inner.cache.get(&page_num).cloned() {
            inner.stats.hits += 1;
            return Ok(page);
        }
        inner.stats.misses += 1;
        let page_size = inner.page_size as u64;
        inner.file.seek(SeekFrom::Start(page_num as u64 * page_size))?;
        let mut data = vec![0u8; inner.page_size];
        inner.file.read_exact(&mut data)?;
        let page = Page { data };
        if inner.cache.put(page_num, page.clone()).is_some() {
            inner.stats.evictions += 1;
        }
        Ok(page)
    }

    fn write_page(&self, page_num: u32, page: &Page) -> io::Result<()> {
        let mut inner = self.inner.write();
        let page_size = inner.page_size as u64;
        inner.file.seek(SeekFrom::Start(page_num as u64 * page_size))?;
        inner.file.write_all(&page.data)?;
        inner.cache.put(page_num, page.clone());
        Ok(())
    }

    fn append_page(&self) -> io::Result<u32> {
        let page_num = self.num_pages()?;
        let page_size = self.page_size();
        self.write_page(page_num, &Page::zeroed(page_size))?;
        Ok(page_num)
    }

    fn sync(&self) -> io::Result<()> {
        self.inner.write().file.flush()
    }
}

/// A pure in-memory [`PagedFileManager`], useful for tests that don't want
/// to touch a filesystem at all.
pub struct MemPagedFileManager {
    inner: RwLock<(usize, HashMap<u32, Page>, u32)>,
}

impl MemPagedFileManager {
    pub fn new(page_size: usize) -> Self {
        MemPagedFileManager {
            inner: RwLock::new((page_size, HashMap::new(), 0)),
        }
    }
}

impl PagedFileManager for MemPagedFileManager {
    fn page_size(&self) -> usize {
        self.inner.read().0
    }

    fn num_pages(&self) -> io::Result<u32> {
        Ok(self.inner.read().2)
    }

    fn read_page(&self, page_num: u32) -> io::Result<Page> {
        let inner = self.inner.read();
        inner.1.get(&page_num).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "page out of range")
        })
    }

    fn write_page(&self, page_num: u32, page: &Page) -> io::Result<()> {
        let mut inner = self.inner.write();
        inner.1.insert(page_num, page.clone());
        Ok(())
    }

    fn append_page(&self) -> io::Result<u32> {
        let mut inner = self.inner.write();
        let page_num = inner.2;
        let page_size = inner.0;
        inner.1.insert(page_num, Page::zeroed(page_size));
        inner.2 += 1;
        Ok(page_num)
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}
