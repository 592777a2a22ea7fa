#![no_main]

use libfuzzer_sys::fuzz_target;
use seqindex::alphabet::Alphabet;

fuzz_target!(|data: &[u8]| {
    if let Ok(alphabet) = Alphabet::parse_al1(data, "fuzz.al1") {
        let rendered = alphabet.to_al1_bytes();
        let reparsed = Alphabet::parse_al1(&rendered, "fuzz.al1").expect("reparse");
        assert_eq!(reparsed, alphabet);
    }
});
