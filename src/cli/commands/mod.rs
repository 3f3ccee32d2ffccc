//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Opens a [`common::Workspace`] (or just the repository, for `init`)
//! 2. Calls into `core`/`engine` to perform the operation
//! 3. Formats and prints its own output
//!
//! Handlers do NOT perform repository mutations directly outside the
//! `core`/`engine`/`git` layers they call into.

pub mod checkout;
pub mod common;
pub mod completion;
pub mod config_cmd;
pub mod delete;
pub mod finish;
pub mod init;
pub mod journal_cmd;
pub mod list;
pub mod overview;
pub mod publish;
pub mod rename;
pub mod start;
pub mod track;
pub mod update;
pub mod version;

use anyhow::Result;

use crate::cli::args::{Command, ConfigAction};
use crate::engine::Context;

/// Dispatch a parsed [`Command`] to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Init { reset, force } => init::init(ctx, reset, force),

        Command::Start { branch_type, name, start_point, fetch, no_fetch } => {
            let fetch_flag = if fetch {
                Some(true)
            } else if no_fetch {
                Some(false)
            } else {
                None
            };
            start::start(ctx, &branch_type, &name, start_point.as_deref(), fetch_flag)
        }

        Command::Finish {
            branch_type,
            name,
            continue_,
            abort,
            strategy,
            no_ff,
            ff,
            tag,
            notag,
            tagname,
            message,
            message_file,
            sign,
            signingkey,
            keep,
            keeplocal,
            keepremote,
            force_delete,
            fetch,
            no_fetch,
        } => finish::finish(
            ctx,
            finish::FinishArgs {
                branch_type: branch_type.as_deref(),
                name: name.as_deref(),
                continue_,
                abort,
                strategy: &strategy,
                no_ff,
                ff,
                tag,
                notag,
                tagname: tagname.as_deref(),
                message: message.as_deref(),
                message_file: message_file.as_deref(),
                sign,
                signingkey: signingkey.as_deref(),
                keep,
                keeplocal,
                keepremote,
                force_delete,
                fetch,
                no_fetch,
            },
        ),

        Command::Update { name, merge, rebase } => update::update(ctx, name.as_deref(), merge, rebase),

        Command::Track { name, remote } => track::track(ctx, &name, remote.as_deref()),

        Command::Publish { name } => publish::publish(ctx, &name),

        Command::Rename { old, new } => rename::rename(ctx, &old, &new),

        Command::Checkout { name } => checkout::checkout(ctx, &name),

        Command::Delete { name, force, keepremote } => delete::delete(ctx, &name, force, keepremote),

        Command::List { branch_type } => list::list(ctx, branch_type.as_deref()),

        Command::Overview => overview::overview(ctx),

        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value, scope } => config_cmd::set(ctx, &key, &value, scope),
            ConfigAction::Unset { key, scope } => config_cmd::unset(ctx, &key, scope),
            ConfigAction::BranchType { action } => config_cmd::branch_type(ctx, action),
        },

        Command::Journal { op } => journal_cmd::journal(ctx, op.as_deref()),

        Command::Version => version::version(),

        Command::Completions { shell } => completion::completion(shell),
    }
}
