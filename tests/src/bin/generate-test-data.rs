use std::path::PathBuf;

use anyhow::Context;
use chrono::{Duration, Utc};
use classmate_api::{Comment, Event, RecordId, Thread, Time};
use rand::{seq::SliceRandom, Rng};

const NUM_EVENTS: usize = 40;
const NUM_THREADS: usize = 60;
const MAX_COMMENTS_PER_THREAD: usize = 8;

const POST_WORD_COUNT: usize = 40;
const COMMENT_WORD_COUNT: usize = 15;

const AUTHORS: &[&str] = &["alice", "bob", "carol", "dave", "erin", "frank"];
const CATEGORIES: &[&str] = &["general", "housing", "courses", "clubs", "sports", "lost-and-found"];

// Somewhere around a campus, so that the events show up close together on a map
const CENTER: (f64, f64) = (47.6553, -122.3035);

fn gen_author(rng: &mut impl Rng) -> String {
    String::from(*AUTHORS.choose(rng).expect("no authors"))
}

fn gen_date(rng: &mut impl Rng, around: Time, spread_days: i64) -> Time {
    around + Duration::minutes(rng.gen_range(-spread_days * 24 * 60..=spread_days * 24 * 60))
}

fn gen_event(rng: &mut impl Rng) -> Event {
    let start = gen_date(rng, Utc::now(), 30);
    let num_attending = rng.gen_range(0..AUTHORS.len());
    let attending = AUTHORS
        .choose_multiple(rng, num_attending)
        .map(|a| serde_json::Value::from(*a))
        .collect::<Vec<_>>();
    Event {
        id: RecordId::generate(rng),
        title: lipsum::lipsum_title(),
        semantic_location: format!("Room {}", rng.gen_range(100..500)),
        latitude: CENTER.0 + rng.gen_range(-0.01..0.01),
        longitude: CENTER.1 + rng.gen_range(-0.01..0.01),
        users_attending: serde_json::Value::Array(attending),
        start_time: start,
        end_time: start + Duration::minutes(rng.gen_range(30..240)),
    }
}

fn gen_thread(rng: &mut impl Rng) -> Thread {
    let timestamp = gen_date(rng, Utc::now() - Duration::days(30), 30);
    let mut comments = (0..rng.gen_range(0..=MAX_COMMENTS_PER_THREAD))
        .map(|_| Comment {
            comment_text: lipsum::lipsum_words(COMMENT_WORD_COUNT),
            timestamp: timestamp + Duration::minutes(rng.gen_range(1..7 * 24 * 60)),
            author: gen_author(rng),
        })
        .collect::<Vec<_>>();
    comments.sort_by_key(|c| c.timestamp);
    Thread {
        id: RecordId::generate(rng),
        post_text: lipsum::lipsum_words(POST_WORD_COUNT),
        timestamp,
        author: gen_author(rng),
        category: String::from(*CATEGORIES.choose(rng).expect("no categories")),
        comments,
    }
}

fn main() -> anyhow::Result<()> {
    let dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| String::from(".")));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {dir:?}"))?;
    let mut rng = rand::thread_rng();

    let events = (0..NUM_EVENTS).map(|_| gen_event(&mut rng)).collect::<Vec<_>>();
    let threads = (0..NUM_THREADS).map(|_| gen_thread(&mut rng)).collect::<Vec<_>>();

    for (file, data) in [
        ("events.json", serde_json::to_vec(&events)),
        ("threads.json", serde_json::to_vec(&threads)),
    ] {
        let path = dir.join(file);
        let data = data.with_context(|| format!("serializing {file}"))?;
        std::fs::write(&path, data).with_context(|| format!("writing {path:?}"))?;
        println!("wrote {path:?}");
    }
    Ok(())
}
