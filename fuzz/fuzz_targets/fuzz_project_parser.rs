#![no_main]

use libfuzzer_sys::fuzz_target;
use seqindex::index::LoaderConfig;
use seqindex::index::project::ProjectRecord;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    // Arbitrary project files must be rejected with an error, never a panic
    let _ = ProjectRecord::parse(data, Path::new("fuzz.prj"), &LoaderConfig::default());
});
