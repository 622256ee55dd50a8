#![no_main]

use libfuzzer_sys::fuzz_target;
use searchq::query::{parse, pipeline, string_human, ParserOptions};

fuzz_target!(|data: &str| {
    let options = ParserOptions::default();
    let Ok(nodes) = parse(data, &options) else {
        return;
    };

    // Printed queries must parse again
    let printed = string_human(&nodes);
    if parse(&printed, &options).is_err() {
        panic!("{:?} printed as unparsable {:?}", data, printed);
    }

    // Keep the DNF small enough to finish
    if data.len() <= 64 {
        let _ = pipeline(data, &options);
    }
});
