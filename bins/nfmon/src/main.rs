//! nfmon - watch netfilter netlink events and dump conntrack tables.

mod event;

use std::io::Write;

use clap::{Parser, Subcommand};
use nfconn::message::{NLM_F_ACK, NLM_F_DUMP};
use nfconn::netfilter::{ProtoFamily, Subsystem, request};
use nfconn::{Config, Conn, Group, namespace};

/// IPCTNL_MSG_CT_GET
const CT_GET: u8 = 1;

#[derive(Parser)]
#[command(name = "nfmon", version, about = "Netfilter netlink event monitor")]
struct Cli {
    /// Network namespace name (under /var/run/netns) or path.
    #[arg(short = 'n', long, global = true)]
    netns: Option<String>,

    /// Socket receive buffer size in bytes.
    #[arg(long, global = true)]
    rcvbuf: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print messages delivered to netfilter multicast groups.
    #[command(visible_alias = "m", visible_alias = "mon")]
    Monitor {
        /// Groups to join (ct-new, ct-update, ct-destroy, exp-new, nftables, ...).
        #[arg(
            short,
            long = "group",
            value_delimiter = ',',
            default_values = ["ct-new", "ct-update", "ct-destroy"]
        )]
        groups: Vec<Group>,

        /// Exit after this many messages.
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Dump the conntrack table and print one line per entry.
    #[command(visible_alias = "d")]
    Dump {
        /// Only dump IPv4 entries.
        #[arg(short = '4', conflicts_with = "ipv6")]
        ipv4: bool,

        /// Only dump IPv6 entries.
        #[arg(short = '6')]
        ipv6: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // The namespace file only has to stay open until the socket exists
    let ns = match cli.netns.as_deref() {
        Some(path) if path.contains('/') => Some(namespace::open_path(path)?),
        Some(name) => Some(namespace::open(name)?),
        None => None,
    };

    let mut config = Config::new();
    if let Some(ns) = &ns {
        config = config.netns(ns.as_raw_fd());
    }
    if let Some(bytes) = cli.rcvbuf {
        config = config.recv_buffer_size(bytes);
    }

    match cli.command {
        Command::Monitor { groups, count } => monitor(config.groups(&groups), count),
        Command::Dump { ipv4, ipv6 } => {
            let family = match (ipv4, ipv6) {
                (true, _) => ProtoFamily::Ipv4,
                (_, true) => ProtoFamily::Ipv6,
                _ => ProtoFamily::Unspec,
            };
            dump(config, family)
        }
    }
}

fn monitor(config: Config, count: Option<usize>) -> anyhow::Result<()> {
    let mut conn = Conn::dial(Some(&config))?;
    tracing::info!("monitoring netfilter events");

    let mut stdout = std::io::stdout().lock();
    let mut seen = 0usize;

    loop {
        for msg in conn.receive()? {
            writeln!(stdout, "{}", event::describe(&msg))?;
            seen += 1;
            if count.is_some_and(|limit| seen >= limit) {
                return Ok(conn.close()?);
            }
        }
    }
}

fn dump(config: Config, family: ProtoFamily) -> anyhow::Result<()> {
    let mut conn = Conn::dial(Some(&config))?;

    let msg = request(
        Subsystem::Conntrack,
        CT_GET,
        family,
        NLM_F_DUMP | NLM_F_ACK,
        &[],
    );
    let replies = conn.query(msg)?;

    let mut stdout = std::io::stdout().lock();
    let mut entries = 0usize;
    for reply in replies.iter().filter(|m| !m.header.is_error()) {
        writeln!(stdout, "{}", event::describe(reply))?;
        entries += 1;
    }
    writeln!(stdout, "{} entries", entries)?;

    Ok(conn.close()?)
}
