use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use super::*;

// Test runtime. Outbound messages are queued for the test harness to
// deliver, ids are zero padded counters tagged with the replica name so
// that lexical order is total across replicas.
struct TestRt {
    name: String,
    counter: u64,
    sent: Vec<Vec<u8>>,
}

impl TestRt {
    fn new(name: &str) -> TestRt {
        TestRt {
            name: name.to_string(),
            counter: 0,
            sent: vec![],
        }
    }
}

impl Runtime for TestRt {
    fn get_uid(&mut self) -> String {
        self.counter += 1;
        format!("{:010}.{}", self.counter, self.name)
    }

    fn send(&mut self, raw: Vec<u8>) -> Result<()> {
        self.sent.push(raw);
        Ok(())
    }
}

fn flush(replica: &mut Replica<TestRt>) -> Vec<Vec<u8>> {
    std::mem::take(&mut replica.as_mut_runtime().sent)
}

#[test]
fn test_local_editing() {
    let mut replica = Replica::new("test_local_editing", TestRt::new("a"));
    assert_eq!(replica.to_name(), "test_local_editing".to_string());
    assert_eq!(replica.is_empty(), true);

    let events = replica.insert(0, "hello").unwrap();
    assert_eq!(events.len(), 5);
    for (i, event) in events.into_iter().enumerate() {
        assert_eq!(event, Event::Insert { start: i, count: 1, meta: None });
    }
    assert_eq!(replica.len(), 5);
    assert_eq!(replica.to_text(), "hello".to_string());

    let events = replica.insert(2, "X").unwrap();
    assert_eq!(events, vec![Event::Insert { start: 2, count: 1, meta: None }]);
    assert_eq!(replica.to_text(), "heXllo".to_string());
    assert_eq!(replica.index_of(&replica.position_at(3).unwrap()).unwrap(), (3, true));

    let events = replica.delete(1, 1).unwrap();
    assert_eq!(
        events,
        vec![Event::Delete {
            start: 1,
            count: 1,
            deleted: "e".to_string(),
            meta: None
        }]
    );
    assert_eq!(replica.to_text(), "hXllo".to_string());
    assert_eq!(replica.len(), 5);
    assert_eq!(replica.to_seqno(), 7);
    assert_eq!(replica.as_runtime().sent.len(), 7);
    replica.validate().unwrap();
}

#[test]
fn test_delete_range() {
    let mut replica = Replica::new("test_delete_range", TestRt::new("a"));
    replica.insert(0, "abcdef").unwrap();

    // targets resolve right to left.
    let events = replica.delete(1, 3).unwrap();
    let deleted: Vec<String> = events
        .iter()
        .map(|e| match e {
            Event::Delete { deleted, .. } => deleted.clone(),
            _ => panic!("unexpected event"),
        })
        .collect();
    assert_eq!(deleted, vec!["d".to_string(), "c".to_string(), "b".to_string()]);
    assert_eq!(replica.to_text(), "aef".to_string());
    assert_eq!(replica.len(), 3);

    assert_eq!(replica.delete(0, 0).unwrap(), vec![]);

    match replica.delete(1, 3) {
        Err(Error::IndexOutOfBounds(_, _)) => (),
        res => panic!("{:?}", res),
    }
    match replica.insert(4, "x") {
        Err(Error::IndexOutOfBounds(_, _)) => (),
        res => panic!("{:?}", res),
    }
    replica.validate().unwrap();
}

#[test]
fn test_same_index_interleaving() {
    let mut a = Replica::new("a", TestRt::new("a"));
    let mut b = Replica::new("b", TestRt::new("b"));

    a.insert(0, "A").unwrap();
    b.insert(0, "B").unwrap();

    for raw in flush(&mut a).into_iter() {
        b.receive(&raw, None).unwrap();
    }
    for raw in flush(&mut b).into_iter() {
        a.receive(&raw, None).unwrap();
    }

    // "0000000001.a" sorts before "0000000001.b".
    assert_eq!(a.to_text(), "AB".to_string());
    assert_eq!(b.to_text(), "AB".to_string());
    a.validate().unwrap();
    b.validate().unwrap();
}

#[test]
fn test_concurrent_runs() {
    let n_replicas = 10;
    let n_chars = 100;

    let mut replicas: Vec<Replica<TestRt>> = (0..n_replicas)
        .map(|i| {
            let name = format!("r{}", i);
            Replica::new(&name, TestRt::new(&name))
        })
        .collect();

    for (i, replica) in replicas.iter_mut().enumerate() {
        let ch = ((b'a' + (i as u8)) as char).to_string();
        for _ in 0..n_chars {
            let at = replica.len();
            replica.insert(at, &ch).unwrap();
        }
    }

    let batches: Vec<Vec<Vec<u8>>> = replicas.iter_mut().map(|r| flush(r)).collect();
    for (j, replica) in replicas.iter_mut().enumerate() {
        for (i, batch) in batches.iter().enumerate() {
            if i == j {
                continue;
            }
            for raw in batch.iter() {
                replica.receive(raw, None).unwrap();
            }
        }
    }

    let text = replicas[0].to_text();
    assert_eq!(text.chars().count(), n_replicas * n_chars);
    for replica in replicas.iter() {
        assert_eq!(replica.len(), n_replicas * n_chars);
        assert_eq!(replica.to_text(), text);
        replica.validate().unwrap();
    }
}

#[test]
fn test_convergence() {
    let seed: u128 = random();
    // let seed: u128 = 306171699234476756746827099155462650145;
    println!("test_convergence seed {}", seed);
    let mut rng = SmallRng::from_seed({
        let b = seed.to_le_bytes();
        let mut s = [0u8; 32];
        s[..16].copy_from_slice(&b);
        s[16..].copy_from_slice(&b);
        s
    });

    let n_rounds = 30;

    let mut replicas: Vec<Replica<TestRt>> = ["a", "b", "c"]
        .iter()
        .map(|name| Replica::new(name, TestRt::new(name)))
        .collect();

    for _round in 0..n_rounds {
        for replica in replicas.iter_mut() {
            for _ in 0..(rng.gen::<usize>() % 4) {
                if replica.is_empty() || (rng.gen::<u8>() % 100) < 60 {
                    let at = rng.gen::<usize>() % (replica.len() + 1);
                    let ch = ((b'a' + (rng.gen::<u8>() % 26)) as char).to_string();
                    replica.insert(at, &ch).unwrap();
                } else {
                    let at = rng.gen::<usize>() % replica.len();
                    replica.delete(at, 1).unwrap();
                }
            }
        }

        // deliver the round, each receiver walks the senders in its own
        // order, convergence must not depend on the interleaving.
        let batches: Vec<Vec<Vec<u8>>> = replicas.iter_mut().map(|r| flush(r)).collect();
        for j in 0..replicas.len() {
            for s in 0..batches.len() {
                let i = (j + s) % batches.len();
                if i == j {
                    continue;
                }
                for raw in batches[i].iter() {
                    replicas[j].receive(raw, None).unwrap();
                }
            }
        }

        let text = replicas[0].to_text();
        for replica in replicas.iter() {
            assert_eq!(replica.to_text(), text);
            replica.validate().unwrap();
        }
    }
}

#[test]
fn test_remote_events() {
    let mut a = Replica::new("a", TestRt::new("a"));
    let mut b = Replica::new("b", TestRt::new("b"));

    a.insert(0, "x").unwrap();
    let raws = flush(&mut a);
    let event = b.receive(&raws[0], Some(b"m7".to_vec())).unwrap();
    assert_eq!(
        event,
        Some(Event::Insert { start: 0, count: 1, meta: Some(b"m7".to_vec()) })
    );

    a.delete(0, 1).unwrap();
    let raws = flush(&mut a);
    let event = b.receive(&raws[0], Some(b"m8".to_vec())).unwrap();
    assert_eq!(
        event,
        Some(Event::Delete {
            start: 0,
            count: 1,
            deleted: "x".to_string(),
            meta: Some(b"m8".to_vec())
        })
    );
    assert_eq!(b.to_text(), "".to_string());
}

#[test]
fn test_position_stability() {
    let mut a = Replica::new("a", TestRt::new("a"));
    let mut b = Replica::new("b", TestRt::new("b"));

    a.insert(0, "abc").unwrap();
    for raw in flush(&mut a).into_iter() {
        b.receive(&raw, None).unwrap();
    }

    let pos = a.position_at(1).unwrap();

    b.insert(0, "zz").unwrap();
    for raw in flush(&mut b).into_iter() {
        a.receive(&raw, None).unwrap();
    }

    assert_eq!(a.to_text(), "zzabc".to_string());
    assert_eq!(a.index_of(&pos).unwrap(), (3, true));
    assert_eq!(b.index_of(&pos).unwrap(), (3, true));

    // the id survives its own tombstoning.
    a.delete(3, 1).unwrap();
    assert_eq!(a.to_text(), "zzac".to_string());
    assert_eq!(a.index_of(&pos).unwrap(), (3, false));
}

#[test]
fn test_duplicate_delete() {
    let mut a = Replica::new("a", TestRt::new("a"));
    let mut b = Replica::new("b", TestRt::new("b"));

    a.insert(0, "ab").unwrap();
    for raw in flush(&mut a).into_iter() {
        b.receive(&raw, None).unwrap();
    }

    a.delete(0, 1).unwrap();
    let raws = flush(&mut a);
    assert_eq!(raws.len(), 1);

    assert!(b.receive(&raws[0], None).unwrap().is_some());
    let seqno = b.to_seqno();

    // replaying the same delete is a silent no-op.
    assert_eq!(b.receive(&raws[0], None).unwrap(), None);
    assert_eq!(b.to_seqno(), seqno);
    assert_eq!(b.to_text(), "b".to_string());
    assert_eq!(b.to_text(), a.to_text());
    b.validate().unwrap();
}

#[test]
fn test_receive_errors() {
    let mut replica = Replica::new("test_receive_errors", TestRt::new("a"));

    let raw = crate::util::into_cbor_bytes(Op::delete("no-such-id")).unwrap();
    match replica.receive(&raw, None) {
        Err(Error::UnknownId(_, _)) => (),
        res => panic!("{:?}", res),
    }

    let raw = crate::util::into_cbor_bytes(Op::insert("1.x", "no-such-parent", false, 'a')).unwrap();
    match replica.receive(&raw, None) {
        Err(Error::UnknownId(_, _)) => (),
        res => panic!("{:?}", res),
    }

    let raw = crate::util::into_cbor_bytes(Op::Ins {
        id: "1.x".to_string(),
        parent: "".to_string(),
        left: false,
        value: "more-than-one-char".to_string(),
    })
    .unwrap();
    match replica.receive(&raw, None) {
        Err(Error::Invalid(_, _)) => (),
        res => panic!("{:?}", res),
    }

    match replica.receive(&[0xff, 0x00, 0x01], None) {
        Err(Error::FailCbor(_, _)) => (),
        res => panic!("{:?}", res),
    }

    // failed handlers emit nothing and leave the text untouched.
    assert_eq!(replica.to_seqno(), 0);
    assert_eq!(replica.to_text(), "".to_string());
}

#[test]
fn test_trace_replay() {
    let trace: Vec<(usize, Option<char>)> = vec![
        (0, Some('t')),
        (1, Some('e')),
        (2, Some('x')),
        (3, Some('t')),
        (0, Some('o')),
        (1, None),
        (1, Some('t')),
    ];

    let mut replica = Replica::new("test_trace_replay", TestRt::new("a"));
    for (at, op) in trace.into_iter() {
        match op {
            Some(ch) => {
                replica.insert(at, &ch.to_string()).unwrap();
            }
            None => {
                replica.delete(at, 1).unwrap();
            }
        }
    }

    assert_eq!(replica.to_text(), "otext".to_string());
    replica.validate().unwrap();
}

#[test]
fn test_snapshot() {
    let mut a = Replica::new("a", TestRt::new("a"));
    a.insert(0, "hello world").unwrap();
    a.delete(5, 1).unwrap();
    assert_eq!(a.to_text(), "helloworld".to_string());

    let data = a.to_snapshot().unwrap();
    let mut b = Replica::from_snapshot("b", TestRt::new("b"), &data).unwrap();

    assert_eq!(b.to_name(), "b".to_string());
    assert_eq!(b.to_text(), a.to_text());
    assert_eq!(b.to_seqno(), a.to_seqno());
    assert_eq!(b.len(), a.len());
    assert_eq!(b.as_index().deleted_count(), 1);
    assert_eq!(b.as_index().node_count(), 11);
    b.validate().unwrap();

    // positions survive the round-trip.
    assert_eq!(b.position_at(4).unwrap(), a.position_at(4).unwrap());

    b.insert(0, "x").unwrap();
    assert_eq!(b.to_text(), "xhelloworld".to_string());
    b.validate().unwrap();

    let stats = b.to_stats().unwrap();
    assert_eq!(stats.n_count, 11);
    assert_eq!(stats.n_deleted, 1);
    println!("{}", stats);
}
