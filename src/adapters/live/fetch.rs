//! Live adapter for the `ScoreboardSource` port over HTTPS.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{FetchError, ModelError};
use crate::model::{DayTask, Member, ResourceKey, Scoreboard};
use crate::ports::{FetchFuture, ScoreboardSource};

/// Default base URL of the event site.
pub const DEFAULT_API_BASE: &str = "https://adventofcode.com";

/// Longest response body kept in a [`FetchError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Fetches private scoreboards with a session cookie.
pub struct HttpScoreboardSource {
    client: Client,
    api_base: String,
    session: String,
    aliases: HashMap<String, String>,
}

impl HttpScoreboardSource {
    /// Creates a source that authenticates with `session`.
    #[must_use]
    pub fn new(client: Client, api_base: &str, session: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            session: session.to_string(),
            aliases: HashMap::new(),
        }
    }

    /// Display aliases keyed by account name.
    #[must_use]
    pub fn with_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// URL of the JSON document for `key`.
    #[must_use]
    pub fn url(&self, key: ResourceKey) -> String {
        format!("{}/{}/leaderboard/private/view/{}.json", self.api_base, key.year, key.owner_id)
    }
}

impl ScoreboardSource for HttpScoreboardSource {
    fn fetch(&self, key: ResourceKey) -> FetchFuture<'_> {
        Box::pin(async move {
            let url = self.url(key);
            tracing::debug!(leaderboard = %key, url = %url, "fetching scoreboard");

            let response = self
                .client
                .get(&url)
                .header(ACCEPT, "application/json")
                .header(COOKIE, format!("session={}", self.session))
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            let mut body =
                response.text().await.map_err(|e| FetchError::Transport(e.to_string()))?;

            if !status.is_success() {
                if body.len() > MAX_ERROR_BODY {
                    let cut = (0..=MAX_ERROR_BODY).rev().find(|&i| body.is_char_boundary(i));
                    body.truncate(cut.unwrap_or(0));
                }
                return Err(FetchError::Status { status: status.as_u16(), body });
            }

            let board = parse_scoreboard(&body, key, &self.aliases)?;
            tracing::debug!(leaderboard = %key, members = board.member_count(), "fetched scoreboard");
            Ok(board)
        })
    }
}

// --- Wire format ---

/// Numbers appear both as JSON numbers and as strings in older documents.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Number(i64),
    Text(String),
}

impl Lenient {
    fn as_i64(&self, field: &str) -> Result<i64, FetchError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| FetchError::Decode(format!("`{field}` is not a number: {s:?}"))),
        }
    }
}

#[derive(Deserialize)]
struct WireScoreboard {
    event: Lenient,
    owner_id: Lenient,
    #[serde(default)]
    members: BTreeMap<String, WireMember>,
}

#[derive(Deserialize)]
struct WireMember {
    id: Lenient,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    local_score: i64,
    #[serde(default)]
    global_score: i64,
    #[serde(default)]
    stars: u32,
    #[serde(default)]
    completion_day_level: BTreeMap<String, BTreeMap<String, WireStar>>,
}

#[derive(Deserialize)]
struct WireStar {
    get_star_ts: Lenient,
}

/// Parses a scoreboard document as served by the event site.
///
/// `expected` is the key that was requested; a document describing another
/// scoreboard is rejected. Member names found in `aliases` get the mapped
/// display alias.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] if the body is not the expected JSON shape
/// and [`FetchError::Malformed`] if it describes an impossible scoreboard.
pub fn parse_scoreboard(
    body: &str,
    expected: ResourceKey,
    aliases: &HashMap<String, String>,
) -> Result<Scoreboard, FetchError> {
    let wire: WireScoreboard =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let year = i32::try_from(wire.event.as_i64("event")?)
        .map_err(|_| FetchError::Decode("`event` is out of range".into()))?;
    let owner_id = as_id(&wire.owner_id, "owner_id")?;
    let key = ResourceKey::new(year, owner_id);
    if key != expected {
        return Err(FetchError::Decode(format!("expected scoreboard {expected}, received {key}")));
    }

    let mut board = Scoreboard::empty(key);
    for (map_key, wire_member) in wire.members {
        let member = parse_member(wire_member, aliases)?;
        let listed_as = map_key
            .parse::<u64>()
            .map_err(|_| FetchError::Decode(format!("member key {map_key:?} is not an id")))?;
        if listed_as != member.id() {
            return Err(ModelError::MemberKeyMismatch { key: listed_as, member: member.id() }.into());
        }
        board.add_member(member);
    }
    Ok(board)
}

fn parse_member(wire: WireMember, aliases: &HashMap<String, String>) -> Result<Member, FetchError> {
    let id = as_id(&wire.id, "id")?;
    let alias = wire.name.as_ref().and_then(|name| aliases.get(name)).cloned();
    let mut member = Member::new(id)
        .with_name(wire.name)
        .with_alias(alias)
        .with_scores(wire.local_score, wire.global_score)
        .with_stars(wire.stars);

    for (day, levels) in wire.completion_day_level {
        let day: i64 = day
            .parse()
            .map_err(|_| FetchError::Decode(format!("day {day:?} is not a number")))?;
        let completions = levels
            .values()
            .map(|star| timestamp(star.get_star_ts.as_i64("get_star_ts")?))
            .collect::<Result<Vec<_>, FetchError>>()?;
        member = member.with_task(DayTask::with_levels(day, completions)?);
    }
    Ok(member)
}

fn as_id(value: &Lenient, field: &str) -> Result<u64, FetchError> {
    u64::try_from(value.as_i64(field)?)
        .map_err(|_| FetchError::Decode(format!("`{field}` must not be negative")))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, FetchError> {
    DateTime::from_timestamp(secs, 0).ok_or(FetchError::Malformed(ModelError::TimestampOutOfRange(secs)))
}
