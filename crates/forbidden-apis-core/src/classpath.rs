//! Classpath containers and the caching class resolver.
//!
//! The resolver loads [`ClassMetadata`] on demand from an ordered list of
//! directories, jars and jmods. The first container that defines a name
//! wins. Every lookup, including misses, is cached for the life of the
//! resolver; the classpath is assumed not to change during a run.

use crate::classfile::descriptor::internal_name;
use crate::classfile::{parse_class, ClassMetadata, ClassParseError, ParseMode};

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

/// Errors raised while reading classpath containers.
#[derive(Debug, Error)]
pub enum ClasspathError {
    /// A file or directory could not be read.
    #[error("IO error while reading {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// An archive could not be opened or an entry could not be read.
    #[error("ZIP error while reading {path}: {source}")]
    Zip {
        /// Archive path.
        path: PathBuf,
        /// Underlying error.
        source: ZipError,
    },

    /// A class on the classpath is not a valid class file.
    #[error("Class parse error in {origin}: {source}")]
    ClassFile {
        /// `path/to/Foo.class` or `lib.jar!/pkg/Foo.class`.
        origin: String,
        /// Underlying error.
        source: ClassParseError,
    },

    /// A java home without `jmods/` or `rt.jar`.
    #[error("no jmods directory or rt.jar found under java home {path}")]
    InvalidJavaHome {
        /// The java home given.
        path: PathBuf,
    },
}

/// One classpath element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClasspathEntry {
    /// A directory of `.class` files laid out by package.
    Directory(PathBuf),
    /// A `.jar` or `.zip` archive.
    Archive(PathBuf),
    /// A `.jmod` file; classes live under `classes/`.
    Jmod(PathBuf),
}

impl ClasspathEntry {
    /// Path of the container.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Directory(p) | Self::Archive(p) | Self::Jmod(p) => p,
        }
    }
}

/// An ordered list of class containers.
#[derive(Debug, Clone, Default)]
pub struct Classpath {
    entries: Vec<ClasspathEntry>,
}

impl Classpath {
    /// Creates an empty classpath.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a classpath from paths, skipping the ones that don't exist.
    #[must_use]
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut classpath = Self::new();
        for path in paths {
            classpath.push(path);
        }
        classpath
    }

    /// Appends a path, classifying it by type and extension. Nonexistent
    /// paths are skipped with a warning; returns whether it was added.
    pub fn push(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if !path.exists() {
            warn!("Skipping nonexistent classpath entry: {}", path.display());
            return false;
        }
        let entry = if path.is_dir() {
            ClasspathEntry::Directory(path)
        } else if has_extension(&path, "jmod") {
            ClasspathEntry::Jmod(path)
        } else {
            ClasspathEntry::Archive(path)
        };
        self.entries.push(entry);
        true
    }

    /// Appends the runtime classes of a JDK: every `jmods/*.jmod` in name
    /// order, or `jre/lib/rt.jar` / `lib/rt.jar` for pre-9 runtimes.
    ///
    /// # Errors
    ///
    /// Fails if neither layout is present or `jmods/` cannot be listed.
    pub fn add_java_home(&mut self, java_home: &Path) -> Result<usize, ClasspathError> {
        let jmods = java_home.join("jmods");
        if jmods.is_dir() {
            let mut modules: Vec<PathBuf> = fs::read_dir(&jmods)
                .map_err(|source| ClasspathError::Io {
                    path: jmods.clone(),
                    source,
                })?
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .filter(|path| has_extension(path, "jmod"))
                .collect();
            modules.sort();
            let count = modules.len();
            self.entries
                .extend(modules.into_iter().map(ClasspathEntry::Jmod));
            debug!("Added {count} jmods from {}", jmods.display());
            return Ok(count);
        }

        for candidate in ["jre/lib/rt.jar", "lib/rt.jar"] {
            let rt = java_home.join(candidate);
            if rt.is_file() {
                self.entries.push(ClasspathEntry::Archive(rt));
                return Ok(1);
            }
        }

        Err(ClasspathError::InvalidJavaHome {
            path: java_home.to_path_buf(),
        })
    }

    /// Entries in lookup order.
    #[must_use]
    pub fn entries(&self) -> &[ClasspathEntry] {
        &self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Splits a platform path list (`a.jar:b.jar`, `a.jar;b.jar` on Windows).
#[must_use]
pub fn split_path_list(list: &str) -> Vec<PathBuf> {
    std::env::split_paths(list)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

enum Container {
    Directory(PathBuf),
    Archive {
        path: PathBuf,
        prefix: &'static str,
        archive: Mutex<ZipArchive<BufReader<File>>>,
    },
}

impl Container {
    fn open(entry: &ClasspathEntry) -> Result<Self, ClasspathError> {
        let (path, prefix) = match entry {
            ClasspathEntry::Directory(path) => {
                fs::read_dir(path).map_err(|source| ClasspathError::Io {
                    path: path.clone(),
                    source,
                })?;
                return Ok(Self::Directory(path.clone()));
            }
            ClasspathEntry::Archive(path) => (path, ""),
            ClasspathEntry::Jmod(path) => (path, "classes/"),
        };
        let file = File::open(path).map_err(|source| ClasspathError::Io {
            path: path.clone(),
            source,
        })?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|source| ClasspathError::Zip {
                path: path.clone(),
                source,
            })?;
        Ok(Self::Archive {
            path: path.clone(),
            prefix,
            archive: Mutex::new(archive),
        })
    }

    /// Reads `internal.class`, returning the bytes and a display origin.
    fn read(&self, internal: &str) -> Result<Option<(Vec<u8>, String)>, ClasspathError> {
        match self {
            Self::Directory(root) => {
                let path = root.join(format!("{internal}.class"));
                if !path.is_file() {
                    return Ok(None);
                }
                let bytes = fs::read(&path).map_err(|source| ClasspathError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(Some((bytes, path.display().to_string())))
            }
            Self::Archive {
                path,
                prefix,
                archive,
            } => {
                let entry_name = format!("{prefix}{internal}.class");
                let mut archive = archive.lock();
                let mut file = match archive.by_name(&entry_name) {
                    Ok(file) => file,
                    Err(ZipError::FileNotFound) => return Ok(None),
                    Err(source) => {
                        return Err(ClasspathError::Zip {
                            path: path.clone(),
                            source,
                        })
                    }
                };
                let mut bytes = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
                file.read_to_end(&mut bytes)
                    .map_err(|source| ClasspathError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Ok(Some((bytes, format!("{}!/{entry_name}", path.display()))))
            }
        }
    }
}

/// A member lookup key for [`ClasspathResolver::resolve_member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberQuery<'a> {
    /// A field by name.
    Field {
        /// Field name.
        name: &'a str,
    },
    /// A method by exact descriptor.
    Method {
        /// Method name.
        name: &'a str,
        /// Full method descriptor.
        descriptor: &'a str,
    },
    /// A method by parameter part only, e.g. `(I)`.
    MethodParams {
        /// Method name.
        name: &'a str,
        /// Parameter part of the descriptor.
        params: &'a str,
    },
    /// Any field or method with this name.
    AnyNamed {
        /// Member name.
        name: &'a str,
    },
}

impl MemberQuery<'_> {
    fn declared_in(&self, class: &ClassMetadata) -> bool {
        match *self {
            Self::Field { name } => class.field(name).is_some(),
            Self::Method { name, descriptor } => class.method(name, descriptor).is_some(),
            Self::MethodParams { name, params } => class.method_by_params(name, params).is_some(),
            Self::AnyNamed { name } => class.declares_member_named(name),
        }
    }
}

/// A class and every ancestor the walk could load.
#[derive(Debug, Clone, Default)]
pub struct Lineage {
    /// Walk order: the class, its superclass chain, then interfaces
    /// breadth-first.
    pub classes: Vec<Arc<ClassMetadata>>,
    /// Names the walk reached but could not load, or that closed a
    /// superclass cycle.
    pub missing: Vec<String>,
}

/// Outcome of [`ClasspathResolver::resolve_member`].
#[derive(Debug, Clone)]
pub enum MemberResolution {
    /// The owner loaded. `lineage` holds the classes walked, ending at the
    /// declarer when there is one.
    Resolved {
        /// Walk order as in [`Lineage::classes`].
        lineage: Vec<Arc<ClassMetadata>>,
        /// Index of the first declaring type.
        declarer: Option<usize>,
        /// Ancestors reached before the walk stopped that could not be
        /// loaded.
        missing: Vec<String>,
    },
    /// The owner itself could not be loaded.
    Unresolvable {
        /// The missing class.
        class: String,
    },
}

/// Lazy walk over a class and its ancestors, created by
/// [`ClasspathResolver::ancestors`]. Each ancestor is loaded only when the
/// walk reaches it.
pub struct Ancestors<'r> {
    resolver: &'r ClasspathResolver,
    seen: HashSet<String>,
    next_super: Option<String>,
    interfaces: VecDeque<String>,
    missing: Vec<String>,
}

impl Ancestors<'_> {
    /// Loads the next class in walk order, skipping names that cannot be
    /// loaded. `Ok(None)` ends the walk.
    ///
    /// # Errors
    ///
    /// Propagates [`ClasspathResolver::load`] failures.
    pub fn next_class(&mut self) -> Result<Option<Arc<ClassMetadata>>, ClasspathError> {
        while let Some(name) = self.next_super.take() {
            if !self.seen.insert(name.clone()) {
                warn!("Cyclic superclass chain through {name}");
                self.missing.push(name);
                break;
            }
            match self.resolver.load(&name)? {
                Some(class) => {
                    self.next_super.clone_from(&class.super_class);
                    self.interfaces.extend(class.interfaces.iter().cloned());
                    return Ok(Some(class));
                }
                None => self.missing.push(name),
            }
        }

        while let Some(name) = self.interfaces.pop_front() {
            if !self.seen.insert(name.clone()) {
                continue;
            }
            match self.resolver.load(&name)? {
                Some(class) => {
                    self.interfaces.extend(class.interfaces.iter().cloned());
                    return Ok(Some(class));
                }
                None => self.missing.push(name),
            }
        }
        Ok(None)
    }

    /// Names reached so far that could not be loaded.
    #[must_use]
    pub fn missing(&self) -> &[String] {
        &self.missing
    }

    fn into_missing(self) -> Vec<String> {
        self.missing
    }
}

/// On-demand, caching class index over a [`Classpath`].
///
/// Safe to share across threads: concurrent loads of the same name may
/// both parse, but the first insert wins and later readers see it.
pub struct ClasspathResolver {
    containers: Vec<Container>,
    overlay: HashMap<String, Arc<ClassMetadata>>,
    cache: RwLock<HashMap<String, Option<Arc<ClassMetadata>>>>,
}

impl ClasspathResolver {
    /// Opens every container of `classpath`.
    ///
    /// # Errors
    ///
    /// Any entry that exists but cannot be opened is fatal.
    pub fn open(classpath: &Classpath) -> Result<Self, ClasspathError> {
        let containers = classpath
            .entries()
            .iter()
            .map(Container::open)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Opened {} classpath containers", containers.len());
        Ok(Self {
            containers,
            overlay: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Registers an already-parsed class, consulted ahead of the
    /// containers. Used for the classes under check.
    pub fn add_overlay(&mut self, class: Arc<ClassMetadata>) {
        self.overlay.insert(class.name.clone(), class);
    }

    /// Loads a class by dotted binary name. `Ok(None)` means missing.
    ///
    /// # Errors
    ///
    /// I/O failures and malformed class files on the classpath.
    pub fn load(&self, name: &str) -> Result<Option<Arc<ClassMetadata>>, ClasspathError> {
        if let Some(class) = self.overlay.get(name) {
            return Ok(Some(Arc::clone(class)));
        }
        if let Some(cached) = self.cache.read().get(name) {
            return Ok(cached.clone());
        }

        let loaded = self.load_uncached(name)?;
        let mut cache = self.cache.write();
        Ok(cache.entry(name.to_string()).or_insert(loaded).clone())
    }

    fn load_uncached(&self, name: &str) -> Result<Option<Arc<ClassMetadata>>, ClasspathError> {
        let internal = internal_name(name);
        for container in &self.containers {
            if let Some((bytes, origin)) = container.read(&internal)? {
                let class = parse_class(&bytes, ParseMode::Structure)
                    .map_err(|source| ClasspathError::ClassFile { origin: origin.clone(), source })?;
                debug!("Loaded {name} from {origin}");
                return Ok(Some(Arc::new(class)));
            }
        }
        debug!("Class not found on classpath: {name}");
        Ok(None)
    }

    /// Starts a lazy walk at `name`.
    #[must_use]
    pub fn ancestors(&self, name: &str) -> Ancestors<'_> {
        Ancestors {
            resolver: self,
            seen: HashSet::new(),
            next_super: Some(name.to_string()),
            interfaces: VecDeque::new(),
            missing: Vec::new(),
        }
    }

    /// Loads `name` and every ancestor reachable from it.
    ///
    /// # Errors
    ///
    /// Propagates [`ClasspathResolver::load`] failures.
    pub fn lineage(&self, name: &str) -> Result<Lineage, ClasspathError> {
        let mut walk = self.ancestors(name);
        let mut classes = Vec::new();
        while let Some(class) = walk.next_class()? {
            classes.push(class);
        }
        Ok(Lineage {
            classes,
            missing: walk.into_missing(),
        })
    }

    /// Walks `owner`'s ancestry until the first type declaring the member.
    /// Ancestors past the declarer are never loaded.
    ///
    /// # Errors
    ///
    /// Propagates [`ClasspathResolver::load`] failures.
    pub fn resolve_member(
        &self,
        owner: &str,
        query: MemberQuery<'_>,
    ) -> Result<MemberResolution, ClasspathError> {
        let mut walk = self.ancestors(owner);
        let mut lineage = Vec::new();
        let mut declarer = None;
        while let Some(class) = walk.next_class()? {
            let found = query.declared_in(&class);
            lineage.push(class);
            if found {
                declarer = Some(lineage.len() - 1);
                break;
            }
        }
        if lineage.is_empty() {
            return Ok(MemberResolution::Unresolvable {
                class: owner.to_string(),
            });
        }
        Ok(MemberResolution::Resolved {
            lineage,
            declarer,
            missing: walk.into_missing(),
        })
    }

    /// Number of names looked up so far, hits and misses.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }
}
