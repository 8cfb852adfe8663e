#![no_main]

use libfuzzer_sys::fuzz_target;
use mbhash::MultiHash;

fuzz_target!(|data: Vec<u8>| {
    let mut whole = MultiHash::new();
    whole.update(&data).unwrap();
    let expected = whole.finalize();

    // Verify: any split produces the same digest
    for step in [1, 7, 64, 1000, 1024, 1025] {
        let mut parts = MultiHash::new();
        for part in data.chunks(step) {
            parts.update(part).unwrap();
        }
        assert_eq!(parts.total_len(), data.len() as u64);
        assert_eq!(parts.finalize(), expected);
    }
});
