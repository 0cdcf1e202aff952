//! Offline evaluation of a rule file.

use crate::ops::output::{print_json, OutputFormat};
use crate::ops::ui::{
    print_decision, print_empty, print_kv, print_section, print_table_header, print_table_row,
    print_warning,
};
use anyhow::Context;
use clap::Args;
use portcullis_core::path::real_path;
use portcullis_core::{parse_byte_size, Actor, MemoryKind, RuleSet, RuleStore};
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// Who the rule set is assembled for.
#[derive(Args, Debug, Clone)]
pub struct Subject {
    /// User name rules are selected for
    #[arg(long, short, env = "USER", default_value = "ANONYMOUS")]
    pub user: String,
    /// Groups of the user (matched by `%group` entries)
    #[arg(long = "group", short, value_delimiter = ',')]
    pub groups: Vec<String>,
    /// Host name matched against rule host patterns
    #[arg(long, env = "PC_HOSTNAME")]
    pub host: Option<String>,
    /// Values for `$uid`, `$gid` and `$home` in mount rules
    #[arg(long)]
    pub uid: Option<u32>,
    #[arg(long)]
    pub gid: Option<u32>,
    #[arg(long)]
    pub home: Option<String>,
}

impl Subject {
    fn actor(&self) -> Actor {
        Actor {
            name: self.user.clone(),
            groups: self.groups.clone(),
            uid: self.uid,
            gid: self.gid,
            home: self.home.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Action(String),
    Privileged,
    Capability(String),
    Mount { path: String, read_only: bool },
    Memory { size: String, kernel: bool },
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Action(a) => write!(f, "action {a}"),
            Query::Privileged => f.write_str("privileged container"),
            Query::Capability(c) => write!(f, "capability {c}"),
            Query::Mount { path, read_only } => {
                write!(f, "mount {path}{}", if *read_only { " (ro)" } else { "" })
            }
            Query::Memory { size, kernel } => {
                let kind = if *kernel {
                    MemoryKind::Kernel
                } else {
                    MemoryKind::Plain
                };
                write!(f, "{kind} {size}")
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvalReport {
    pub query: String,
    pub allowed: bool,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<String>,
}

fn load(rules_file: &Path, subject: &Subject) -> anyhow::Result<RuleSet> {
    let mut store = RuleStore::new(rules_file);
    if let Some(host) = &subject.host {
        store = store.with_hostname(host.clone());
    }
    let set = store
        .load_for(&subject.actor())
        .with_context(|| format!("loading rules from {}", rules_file.display()))?;
    debug!(user = %subject.user, rules = set.len(), "rule set loaded");
    Ok(set)
}

pub fn evaluate(rules: &RuleSet, query: &Query) -> anyhow::Result<EvalReport> {
    let report = |allowed: bool, rule_id: String| EvalReport {
        query: query.to_string(),
        allowed,
        rule_id,
        ceiling: None,
        resolved: None,
    };
    Ok(match query {
        Query::Action(action) => {
            let v = rules.action_allowed(action);
            report(v.allowed, v.rule_id)
        }
        Query::Privileged => {
            let v = rules.privileged_allowed();
            report(v.allowed, v.rule_id)
        }
        Query::Capability(cap) => {
            let v = rules.capability_allowed(cap);
            report(v.allowed, v.rule_id)
        }
        Query::Mount { path, read_only } => {
            let v = rules.mount_allowed(path, *read_only);
            let resolved = real_path(path).ok().map(|p| p.display().to_string());
            EvalReport {
                resolved,
                ..report(v.allowed, v.rule_id)
            }
        }
        Query::Memory { size, kernel } => {
            let bytes = parse_byte_size(size)?;
            let kind = if *kernel {
                MemoryKind::Kernel
            } else {
                MemoryKind::Plain
            };
            let v = rules.memory_within(kind, bytes);
            EvalReport {
                ceiling: v.ceiling,
                ..report(v.allowed, v.rule_id)
            }
        }
    })
}

pub fn eval(
    rules_file: &Path,
    subject: &Subject,
    query: &Query,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let rules = load(rules_file, subject)?;
    let report = evaluate(&rules, query)?;
    match output {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_section(&format!("{}: {}", subject.user, report.query));
            print_decision(report.allowed, &report.rule_id);
            if let Some(ceiling) = report.ceiling {
                print_kv("ceiling", &ceiling.to_string());
            }
            if let Some(resolved) = &report.resolved {
                print_kv("resolved", resolved);
            }
            if rules.is_empty() {
                println!();
                print_warning("no rule applies to this user; default policies decided");
            }
            println!();
        }
    }
    Ok(())
}

/// The effective rule set for a subject, in evaluation order.
pub fn list_rules(rules_file: &Path, subject: &Subject, output: OutputFormat) -> anyhow::Result<()> {
    let rules = load(rules_file, subject)?;
    match output {
        OutputFormat::Json => print_json(&rules)?,
        OutputFormat::Table => {
            print_section(&format!("rules for {}", subject.user));
            if rules.is_empty() {
                print_empty("No rules apply.");
                return Ok(());
            }
            print_table_header(&[("ORDER", 6), ("ID", 20), ("ALLOW", 24), ("DENY", 24)]);
            for rule in rules.rules() {
                let order = rule.order.to_string();
                let allow = rule.allow.join(",");
                let deny = rule.deny.join(",");
                print_table_row(&[
                    (order.as_str(), 6),
                    (rule.id.as_str(), 20),
                    (allow.as_str(), 24),
                    (deny.as_str(), 24),
                ]);
            }
            println!();
        }
    }
    Ok(())
}
