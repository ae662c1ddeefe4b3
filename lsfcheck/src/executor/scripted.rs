use super::{CommandExecutor, Connector};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What a scripted command answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Output { output: String },
    Failure { error: String },
}

impl Reply {
    pub fn ok(output: impl Into<String>) -> Self {
        Reply::Output {
            output: output.into(),
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Reply::Failure {
            error: error.into(),
        }
    }
}

/// Replies for every command containing `matches`. Replies are consumed in
/// order and the last one repeats forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub matches: String,
    pub replies: Vec<Reply>,
}

/// A recorded cluster: per host, the rules its session answers with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub hosts: BTreeMap<String, Vec<Rule>>,
}

impl Transcript {
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }
}

#[derive(Debug)]
struct RuleState {
    matches: String,
    replies: VecDeque<Reply>,
}

/// An in-memory session that answers from a script instead of a host.
///
/// When several rules match a command the one with the longest `matches`
/// wins, so `bhosts -w | grep 'mgmt'` can be scripted next to `bhosts -w`.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<RuleState>>,
    calls: Mutex<Vec<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        rules
            .into_iter()
            .fold(Self::new(), |exec, r| exec.on_sequence(r.matches, r.replies))
    }

    pub fn on(self, matches: impl Into<String>, reply: Reply) -> Self {
        self.on_sequence(matches, vec![reply])
    }

    pub fn on_sequence(self, matches: impl Into<String>, replies: Vec<Reply>) -> Self {
        lock(&self.rules).push(RuleState {
            matches: matches.into(),
            replies: replies.into(),
        });
        self
    }

    /// Every command executed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn count_calls(&self, fragment: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.contains(fragment))
            .count()
    }

    fn reply_for(&self, command: &str) -> Option<Reply> {
        let mut rules = lock(&self.rules);
        let rule = rules
            .iter_mut()
            .filter(|r| command.contains(r.matches.as_str()) && !r.replies.is_empty())
            .max_by_key(|r| r.matches.len())?;
        if rule.replies.len() > 1 {
            rule.replies.pop_front()
        } else {
            rule.replies.front().cloned()
        }
    }
}

impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, command: &str) -> Result<String> {
        lock(&self.calls).push(command.to_string());
        match self.reply_for(command) {
            Some(Reply::Output { output }) => Ok(output),
            Some(Reply::Failure { error }) => Err(Error::transport(command, error)),
            None => Err(Error::transport(command, "no scripted reply for command")),
        }
    }
}

/// A session handed out by [`ScriptedConnector`]; dropping it closes it.
#[derive(Debug)]
pub struct ScriptedSession {
    host: String,
    exec: Arc<ScriptedExecutor>,
    open: Arc<AtomicUsize>,
}

impl ScriptedSession {
    pub fn host(&self) -> &str {
        &self.host
    }
}

impl CommandExecutor for ScriptedSession {
    fn execute(&self, command: &str) -> impl std::future::Future<Output = Result<String>> + Send {
        self.exec.execute(command)
    }
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(host = %self.host, "scripted session closed");
    }
}

/// Hands out [`ScriptedSession`]s per host and counts how many are open.
#[derive(Debug, Default)]
pub struct ScriptedConnector {
    hosts: HashMap<String, Arc<ScriptedExecutor>>,
    open: Arc<AtomicUsize>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transcript(transcript: Transcript) -> Self {
        transcript
            .hosts
            .into_iter()
            .fold(Self::new(), |c, (host, rules)| {
                c.host(host, ScriptedExecutor::from_rules(rules))
            })
    }

    /// Registers the script for `host`. A key of the form `user@host` is
    /// only used for sessions opened as that user.
    pub fn host(mut self, host: impl Into<String>, exec: ScriptedExecutor) -> Self {
        self.hosts.insert(host.into(), Arc::new(exec));
        self
    }

    pub fn executor(&self, host: &str) -> Option<Arc<ScriptedExecutor>> {
        self.hosts.get(host).cloned()
    }

    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn total_connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for ScriptedConnector {
    type Session = ScriptedSession;

    async fn connect(&self, host: &str, user: Option<&str>) -> Result<ScriptedSession> {
        let exec = user
            .and_then(|u| self.hosts.get(&format!("{u}@{host}")))
            .or_else(|| self.hosts.get(host))
            .cloned()
            .ok_or_else(|| {
                Error::transport(format!("connect {host}"), "no route to scripted host")
            })?;
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            host: host.to_string(),
            exec,
            open: self.open.clone(),
        })
    }
}
