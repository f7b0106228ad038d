// File: scrubbot-core/src/services/discord/clean_commands.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use twilight_model::id::marker::{ChannelMarker, UserMarker};
use twilight_model::id::Id;

use crate::clean::{compile_pattern, CleanRequest};
use crate::config::CleanConfig;
use crate::utils::time::{parse_duration, parse_iso_datetime};
use crate::Error;
use scrubbot_common::models::{ChannelScope, CleanLimit};

pub const CLEAN_HELP: &str = "\
**clean** [users...] [traverse] [first_limit] [second_limit] [use_cache] [bots_only] [`regex`] [channels...|*]
  Deletes matching messages. Limits are a message link, a duration such as `2h30M`, or an ISO date-time.
  One limit cleans everything after it; two clean between them.
**clean user** <user> [traverse] [use_cache] [channels...|*]
**clean all** [traverse] [use_cache] [channels...|*]
**clean bots** [traverse] [use_cache] [channels...|*]
**clean regex** `pattern` [traverse] [use_cache] [channels...|*]
**clean until** <limit> [channel]
**clean between** <limit> <limit> [channel]
**clean stop**";

static MESSAGE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:(?:ptb|canary|www)\.)?discord(?:app)?\.com/channels/(?:\d+|@me)/(\d+)/(\d+)/?$",
    )
    .expect("message link pattern compiles")
});

static CHANNEL_MESSAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)-(\d+)$").expect("channel-message pattern compiles"));

static BACKTICK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^`(.+?)`$").expect("backtick pattern compiles"));

/// Raw ids shorter than this are read as counts, not users.
const MIN_SNOWFLAKE_DIGITS: usize = 15;

#[derive(Debug)]
pub enum CleanCommand {
    Help,
    Stop,
    Clean(CleanArgs),
}

/// Arguments as typed; defaults are filled in by [`CleanArgs::into_request`].
#[derive(Debug, Default)]
pub struct CleanArgs {
    pub users: Vec<Id<UserMarker>>,
    pub traverse: Option<usize>,
    pub first_limit: Option<CleanLimit>,
    pub second_limit: Option<CleanLimit>,
    pub use_cache: Option<bool>,
    pub bots_only: bool,
    pub pattern: Option<Regex>,
    pub channels: Option<ChannelScope>,
}

impl CleanArgs {
    fn is_empty(&self) -> bool {
        self.users.is_empty()
            && self.traverse.is_none()
            && self.first_limit.is_none()
            && self.second_limit.is_none()
            && self.pattern.is_none()
            && self.channels.is_none()
    }

    /// Without an explicit count (or with a count of 0), a clean with a lower limit walks up to
    /// `message_limit`; anything else walks `default_traverse`. The cache is
    /// used by default only when cleaning all channels.
    pub fn into_request(self, config: &CleanConfig) -> CleanRequest {
        let traverse = self.traverse.filter(|&n| n > 0).unwrap_or(if self.first_limit.is_some() {
            config.message_limit
        } else {
            config.default_traverse
        });
        let use_cache = self
            .use_cache
            .unwrap_or(matches!(self.channels, Some(ChannelScope::All)));

        CleanRequest {
            traverse,
            channels: self.channels,
            bots_only: self.bots_only,
            users: self.users,
            pattern: self.pattern,
            first_limit: self.first_limit,
            second_limit: self.second_limit,
            use_cache,
        }
    }
}

/// Splits on whitespace, keeping `"quoted strings"` (quotes removed) and
/// `` `backtick spans` `` (backticks kept) together.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                    current.push(q);
                }
            }
            '`' => {
                current.push('`');
                for q in chars.by_ref() {
                    current.push(q);
                    if q == '`' {
                        break;
                    }
                }
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Parses the text after the command prefix. `None` if it is not a clean command.
pub fn parse_clean_command(input: &str, now: DateTime<Utc>) -> Option<Result<CleanCommand, Error>> {
    let tokens = tokenize(input);
    let (name, rest) = tokens.split_first()?;
    if !matches!(name.to_lowercase().as_str(), "clean" | "clear" | "purge") {
        return None;
    }
    Some(parse_clean_args(rest, now))
}

fn parse_clean_args(tokens: &[String], now: DateTime<Utc>) -> Result<CleanCommand, Error> {
    let Some((sub, rest)) = tokens.split_first() else {
        return Ok(CleanCommand::Help);
    };

    let mut parser = TokenParser::new(rest, now);
    let args = match sub.to_lowercase().as_str() {
        "stop" | "cancel" | "abort" => {
            parser.finish()?;
            return Ok(CleanCommand::Stop);
        }
        "user" | "users" => {
            let user = parser
                .next_user()
                .ok_or_else(|| Error::Validation("A user to clean must be given.".into()))?;
            parser.subcommand_tail(CleanArgs { users: vec![user], ..Default::default() })?
        }
        "all" | "everything" => parser.subcommand_tail(CleanArgs::default())?,
        "bots" | "bot" => parser.subcommand_tail(CleanArgs { bots_only: true, ..Default::default() })?,
        "regex" | "word" | "expression" | "pattern" => {
            let pattern = parser
                .next_pattern()?
                .ok_or_else(|| Error::Validation("Regex pattern missing wrapping backticks".into()))?;
            parser.subcommand_tail(CleanArgs { pattern: Some(pattern), ..Default::default() })?
        }
        "until" => {
            let first_limit = parser.required_limit()?;
            parser.range_tail(CleanArgs { first_limit: Some(first_limit), ..Default::default() })?
        }
        "between" | "after-until" | "from-to" => {
            let first_limit = parser.required_limit()?;
            let second_limit = parser.required_limit()?;
            parser.range_tail(CleanArgs {
                first_limit: Some(first_limit),
                second_limit: Some(second_limit),
                ..Default::default()
            })?
        }
        _ => {
            let args = TokenParser::new(tokens, now).master()?;
            if args.is_empty() {
                return Ok(CleanCommand::Help);
            }
            args
        }
    };

    Ok(CleanCommand::Clean(args))
}

fn parse_user(token: &str) -> Option<Id<UserMarker>> {
    let raw = token
        .strip_prefix("<@")
        .and_then(|t| t.strip_suffix('>'))
        .map(|t| t.trim_start_matches('!'));
    let digits = match raw {
        Some(inner) => inner,
        None if token.len() >= MIN_SNOWFLAKE_DIGITS => token,
        None => return None,
    };
    digits.parse::<u64>().ok().and_then(Id::new_checked)
}

fn parse_channel(token: &str) -> Option<Id<ChannelMarker>> {
    let digits = token
        .strip_prefix("<#")
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(token);
    digits.parse::<u64>().ok().and_then(Id::new_checked)
}

fn parse_bool(token: &str) -> Option<bool> {
    match token.to_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "enable" => Some(true),
        "false" | "no" | "n" | "off" | "disable" => Some(false),
        _ => None,
    }
}

fn parse_traverse(token: &str) -> Option<usize> {
    if token.len() >= MIN_SNOWFLAKE_DIGITS {
        return None;
    }
    token.parse().ok()
}

/// A message link, `channel-message` pair, duration, or ISO date-time.
pub fn parse_limit(token: &str, now: DateTime<Utc>) -> Option<CleanLimit> {
    let message_ref = MESSAGE_LINK_RE
        .captures(token)
        .or_else(|| CHANNEL_MESSAGE_RE.captures(token));
    if let Some(caps) = message_ref {
        let channel_id = caps[1].parse::<u64>().ok().and_then(Id::new_checked)?;
        let message_id = caps[2].parse::<u64>().ok().and_then(Id::new_checked)?;
        return Some(CleanLimit::Message { channel_id, message_id });
    }

    if let Some(duration) = parse_duration(token) {
        return Some(CleanLimit::Age(duration.as_duration_at(now)));
    }

    parse_iso_datetime(token).ok().map(CleanLimit::Timestamp)
}

fn parse_pattern(token: &str) -> Result<Option<Regex>, Error> {
    if !token.starts_with('`') {
        return Ok(None);
    }
    let caps = BACKTICK_RE
        .captures(token)
        .ok_or_else(|| Error::Validation("Regex pattern missing wrapping backticks".into()))?;
    compile_pattern(&caps[1]).map(Some)
}

struct TokenParser<'a> {
    tokens: &'a [String],
    pos: usize,
    now: DateTime<Utc>,
}

impl<'a> TokenParser<'a> {
    fn new(tokens: &'a [String], now: DateTime<Utc>) -> Self {
        Self { tokens, pos: 0, now }
    }

    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    /// Consumes the next token if `parse` accepts it.
    fn take<T>(&mut self, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let value = parse(self.peek()?)?;
        self.pos += 1;
        Some(value)
    }

    fn next_user(&mut self) -> Option<Id<UserMarker>> {
        self.take(parse_user)
    }

    fn next_pattern(&mut self) -> Result<Option<Regex>, Error> {
        let Some(token) = self.peek() else {
            return Ok(None);
        };
        let pattern = parse_pattern(token)?;
        if pattern.is_some() {
            self.pos += 1;
        }
        Ok(pattern)
    }

    fn required_limit(&mut self) -> Result<CleanLimit, Error> {
        let now = self.now;
        match self.peek() {
            Some(token) => self
                .take(|t| parse_limit(t, now))
                .ok_or_else(|| Error::Validation(format!("`{token}` is not a message, duration, or date-time."))),
            None => Err(Error::Validation("A message, duration, or date-time limit must be given.".into())),
        }
    }

    /// Remaining tokens as channels: `*` alone, or channel mentions/ids.
    fn channels(&mut self) -> Result<Option<ChannelScope>, Error> {
        let tokens = self.tokens;
        let rest = &tokens[self.pos..];
        self.pos = tokens.len();

        match rest {
            [] => Ok(None),
            [star] if star == "*" => Ok(Some(ChannelScope::All)),
            tokens => tokens
                .iter()
                .map(|t| {
                    parse_channel(t).ok_or_else(|| Error::Validation(format!("`{t}` is not a channel.")))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|ids| Some(ChannelScope::Channels(ids))),
        }
    }

    fn finish(&self) -> Result<(), Error> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(Error::Validation(format!("Unexpected argument `{token}`."))),
        }
    }

    /// `[traverse] [use_cache] [channels...]`; the cache is on unless turned off.
    fn subcommand_tail(mut self, mut args: CleanArgs) -> Result<CleanArgs, Error> {
        args.traverse = self.take(parse_traverse);
        args.use_cache = Some(self.take(parse_bool).unwrap_or(true));
        args.channels = self.channels()?;
        Ok(args)
    }

    /// `[channel]` after an until/between range.
    fn range_tail(mut self, mut args: CleanArgs) -> Result<CleanArgs, Error> {
        if let Some(channel) = self.take(parse_channel) {
            args.channels = Some(ChannelScope::Channels(vec![channel]));
        }
        self.finish()?;
        Ok(args)
    }

    /// The positional master form.
    fn master(mut self) -> Result<CleanArgs, Error> {
        let mut args = CleanArgs::default();
        let now = self.now;

        while let Some(user) = self.next_user() {
            args.users.push(user);
        }
        args.traverse = self.take(parse_traverse);
        args.first_limit = self.take(|t| parse_limit(t, now));
        if args.first_limit.is_some() {
            args.second_limit = self.take(|t| parse_limit(t, now));
        }
        args.use_cache = self.take(parse_bool);
        if args.use_cache.is_some() {
            args.bots_only = self.take(parse_bool).unwrap_or(false);
        }
        args.pattern = self.next_pattern()?;
        args.channels = self.channels()?;
        Ok(args)
    }
}
