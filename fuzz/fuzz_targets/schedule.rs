#![no_main]

use libfuzzer_sys::fuzz_target;
use mbhash::{
    Digest, EngineConfig, LaneScheduler, OpenPolicy, SchedulerConfig, StreamCursor,
    StreamId,
};

fuzz_target!(|data: Vec<u8>| {
    if data.len() < 3 {
        return;
    }

    // Header: batch width, block length, policy
    let width = 1 + (data[0] as usize % 16);
    let block = 1 + (data[1] as usize % 64);
    let policy = if data[2] & 1 == 0 {
        OpenPolicy::AlwaysFirst
    } else {
        OpenPolicy::EntireForSingleChunk
    };
    let config = SchedulerConfig::new(EngineConfig::new(width, block).unwrap())
        .with_open_policy(policy);

    // Body: 0xFF ends a stream, 0xFE ends a chunk
    let mut streams: Vec<Vec<Vec<u8>>> = vec![vec![Vec::new()]];
    for &byte in &data[3..] {
        match byte {
            0xFF => streams.push(vec![Vec::new()]),
            0xFE => streams.last_mut().unwrap().push(Vec::new()),
            b => streams.last_mut().unwrap().last_mut().unwrap().push(b),
        }
    }
    streams.truncate(32);

    let cursors: Vec<StreamCursor> = streams
        .iter()
        .enumerate()
        .map(|(i, c)| StreamCursor::new(StreamId::new(i as u64), c.clone()))
        .collect();

    let mut scheduler = LaneScheduler::new(cursors, config).unwrap();
    let done = scheduler.run_collect().unwrap();

    // Verify: one digest per stream, equal to the one-shot hash
    assert_eq!(done.len(), streams.len());
    for completion in &done {
        let chunks = &streams[completion.stream.get() as usize];
        assert_eq!(completion.consumed, chunks.len());
        assert_eq!(completion.digest, Digest::of(&chunks.concat()));
    }
});
