use anyhow::{anyhow, Context};
use classmate_api::{NewComment, NewEvent, NewThread, TimeInput};

#[derive(structopt::StructOpt)]
struct Opt {
    #[structopt(short, long, env = "CLASSMATE_HOST", default_value = "http://localhost:80")]
    host: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// List all events
    Events,

    /// Show one event
    Event { id: String },

    /// Create an event
    CreateEvent {
        title: String,

        /// Human-readable place, eg. "Library, 2nd floor"
        location: String,

        #[structopt(allow_hyphen_values = true)]
        latitude: f64,

        #[structopt(allow_hyphen_values = true)]
        longitude: f64,

        /// Start time, as RFC 3339 or YYYY-MM-DD
        start: String,

        /// End time, as RFC 3339 or YYYY-MM-DD
        end: String,

        /// Attendees, as any JSON value
        #[structopt(long, default_value = "[]", parse(try_from_str = serde_json::from_str))]
        attending: serde_json::Value,
    },

    /// List the categories used by forum threads
    Categories,

    /// List all forum threads
    Threads,

    /// Show one forum thread
    Thread { id: String },

    /// Start a forum thread
    CreateThread {
        author: String,
        category: String,
        text: String,
    },

    /// Comment on a forum thread
    Comment {
        thread: String,
        author: String,
        text: String,
    },
}

async fn send(req: reqwest::RequestBuilder) -> anyhow::Result<serde_json::Value> {
    let resp = req.send().await.context("sending request")?;
    let status = resp.status();
    let body = resp.bytes().await.context("reading response body")?;
    if !status.is_success() {
        return Err(match classmate_api::Error::parse(&body) {
            Ok(err) => anyhow::Error::new(err),
            Err(_) => anyhow!("server answered with status {status}"),
        });
    }
    serde_json::from_slice(&body).context("parsing response body")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = <Opt as structopt::StructOpt>::from_args();

    let client = reqwest::Client::new();
    let host = opt.host.trim_end_matches('/');

    let req = match opt.cmd {
        Command::Events => client.get(format!("{host}/events")),
        Command::Event { id } => client.get(format!("{host}/events/{id}")),
        Command::CreateEvent {
            title,
            location,
            latitude,
            longitude,
            start,
            end,
            attending,
        } => client.post(format!("{host}/events")).json(&NewEvent {
            title: Some(title),
            semantic_location: Some(location),
            latitude: Some(latitude),
            longitude: Some(longitude),
            users_attending: Some(attending),
            start_time: Some(TimeInput::Text(start)),
            end_time: Some(TimeInput::Text(end)),
        }),
        Command::Categories => client.get(format!("{host}/forum/categories")),
        Command::Threads => client.get(format!("{host}/forum/threads")),
        Command::Thread { id } => client.get(format!("{host}/forum/threads/{id}")),
        Command::CreateThread {
            author,
            category,
            text,
        } => client.post(format!("{host}/forum/threads")).json(&NewThread {
            post_text: Some(text),
            author: Some(author),
            category: Some(category),
            comments: Some(Vec::new()),
        }),
        Command::Comment {
            thread,
            author,
            text,
        } => client
            .post(format!("{host}/forum/threads/{thread}/comment"))
            .json(&NewComment {
                comment_text: Some(text),
                author: Some(author),
            }),
    };

    let res = send(req).await.context("querying the classmate server")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&res).context("formatting response")?
    );
    Ok(())
}
