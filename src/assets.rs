use std::borrow::Cow;
use std::path::Path;
use std::{fs, io};

/// Where the contents of an asset set come from.
pub enum Files {
    /// Compiled into the binary as `(name, contents)` pairs.
    Embedded(&'static [(&'static str, &'static str)]),

    /// Read from `Assets::dir` every time they are requested.
    OnDisk(&'static [&'static str]),
}

pub struct Assets {
    /// The directory these assets live in, in the source tree.
    pub dir: &'static str,

    files: Files,
}

impl Assets {
    pub const fn embedded(dir: &'static str, files: &'static [(&'static str, &'static str)]) -> Self {
        Self {
            dir,
            files: Files::Embedded(files),
        }
    }

    pub const fn on_disk(dir: &'static str, names: &'static [&'static str]) -> Self {
        Self {
            dir,
            files: Files::OnDisk(names),
        }
    }

    pub fn names(&self) -> Box<dyn Iterator<Item = &'static str>> {
        match self.files {
            Files::Embedded(files) => Box::new(files.iter().map(|(n, _)| *n)),
            Files::OnDisk(names) => Box::new(names.iter().copied()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    /// Get the contents of a registered asset. On-disk assets are re-read on
    /// every call so edits show up without a rebuild.
    pub fn load(&self, name: &str) -> io::Result<Cow<'static, str>> {
        match self.files {
            Files::Embedded(files) => files
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, contents)| Cow::Borrowed(*contents))
                .ok_or_else(|| not_registered(name)),
            Files::OnDisk(_) if self.contains(name) => {
                fs::read_to_string(Path::new(self.dir).join(name)).map(Cow::Owned)
            }
            Files::OnDisk(_) => Err(not_registered(name)),
        }
    }
}

fn not_registered(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("asset {name} is not registered"),
    )
}

/// Compile a list of asset files into the binary.
#[macro_export]
macro_rules! embed_assets {
    ($constname:ident, $dirname:literal, [ $($filename:literal),* ]) => {
        pub(crate) const $constname: $crate::assets::Assets = $crate::assets::Assets::embedded(
            concat!(env!("CARGO_MANIFEST_DIR"), "/", $dirname),
            &[$(
                (
                    $filename,
                    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/", $dirname, "/", $filename)),
                ),
            )*],
        );
    };
}

/// Refer to a list of asset files that stay on the filesystem.
#[macro_export]
macro_rules! disk_assets {
    ($constname:ident, $dirname:literal, [ $($filename:literal),* ]) => {
        pub(crate) const $constname: $crate::assets::Assets = $crate::assets::Assets::on_disk(
            concat!(env!("CARGO_MANIFEST_DIR"), "/", $dirname),
            &[$( $filename, )*],
        );
    };
}

/// Embed assets in release builds; read them from the source tree in debug
/// builds.
#[macro_export]
macro_rules! assets {
    ($constname:ident, $dirname:literal, [ $($filename:literal),* ]) => {
        #[cfg(debug_assertions)]
        $crate::assets::disk_assets!($constname, $dirname, [ $($filename),* ]);

        #[cfg(not(debug_assertions))]
        $crate::assets::embed_assets!($constname, $dirname, [ $($filename),* ]);
    };
}

pub(crate) use assets;

#[allow(unused_imports)]
pub(crate) use disk_assets;

#[allow(unused_imports)]
pub(crate) use embed_assets;
