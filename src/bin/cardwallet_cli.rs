//!
//! cardwallet CLI binary
//! ---------------------
//! Interactive interpreter for a cardwallet account: authenticate against the
//! remote API, inspect and edit card collections, and manage shared groups
//! and invitations. The session (access/refresh pair) is persisted between
//! runs and refreshed in the background while the interpreter is open.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use cardwallet::api::{ApiClient, InviteAction};
use cardwallet::cards::CardSync;
use cardwallet::cli::print_table;
use cardwallet::config::ClientConfig;
use cardwallet::credentials::CredentialStore;
use cardwallet::groups::GroupService;
use cardwallet::guard::{decide, Route, RouteDecision};
use cardwallet::models::{AddCardsSelection, CardKind, CompanyRegistration, SignupRequest};
use cardwallet::session::SessionManager;

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--api <url>] [--credentials <dir>]\n\nFlags:\n  --api <url>              Base URL of the cardwallet API (default: http://127.0.0.1:8000,\n                           or CARDWALLET_API_URL)\n  --credentials <dir>      Directory for the persisted token slots (default: .cardwallet,\n                           or CARDWALLET_CREDENTIALS_DIR)\n  -h, --help               Show this help\n\nInteractive commands:\n  login <email> <password>             exchange credentials for a session\n  signup <first> <last> <email> <pw>   register and log in\n  register-company <name> <vat> <email>  B2B registration; prints the API key once\n  logout                               clear the session and persisted tokens\n  refresh                              exchange the refresh token now\n  status                               show session state\n  cards                                fetch and list all three card collections\n  upload <kind> <front-file> [back-file]  upload a card scan (kind: idcard|studentcard|healthcard)\n  delete <kind> <id> [group-id]        delete a card, optionally from a group context\n  groups                               list your groups\n  group <id>                           show one group with members and cards\n  create-group <name>                  create a group\n  add-cards <group-id> <id-ids> <student-ids> <health-ids>   comma-separated id lists ('-' for none)\n  invitations                          list pending invitations\n  invite <group-id> <email>            invite a user to a group\n  respond <id> accept|reject           answer a pending invitation\n  help                                 show this help\n  quit | exit                          leave the interpreter\n\nExamples:\n  {program} --api http://127.0.0.1:8000\n    > login a@b.com secret\n    > cards\n    > add-cards 7 1,2 - 3"
    );
}

struct Cli {
    session: SessionManager,
    cards: CardSync,
    groups: GroupService,
}

impl Cli {
    /// Gate a protected command the same way the app gates a protected route.
    fn require_auth(&self) -> bool {
        match decide(Route::Home, &self.session.view()) {
            RouteDecision::Render => true,
            RouteDecision::Loading => {
                eprintln!("session still loading, try again");
                false
            }
            _ => {
                eprintln!("not logged in (use: login <email> <password>)");
                false
            }
        }
    }

    fn token(&self) -> Option<String> {
        self.session.access_token()
    }

    async fn cmd_cards(&self) {
        let Some(token) = self.token() else { return };
        self.cards.refresh_data(&token).await;
        let cols = self.cards.collections();
        println!("id cards:");
        let rows: Vec<Vec<String>> = cols
            .id_cards
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.name.clone(),
                    c.nationality.clone(),
                    c.identifier.clone(),
                    c.expiry_date.clone().unwrap_or_default(),
                ]
            })
            .collect();
        if !print_table(&["id", "name", "nationality", "identifier", "expires"], &rows) {
            println!("  (none)");
        }
        println!("student cards:");
        let rows: Vec<Vec<String>> = cols
            .student_cards
            .iter()
            .map(|c| vec![c.id.to_string(), c.name.clone(), c.card_number.clone(), c.school.clone()])
            .collect();
        if !print_table(&["id", "name", "card number", "school"], &rows) {
            println!("  (none)");
        }
        println!("health-care cards:");
        let rows: Vec<Vec<String>> = cols
            .health_care_cards
            .iter()
            .map(|c| vec![c.id.to_string(), c.name.clone(), c.card_number.clone()])
            .collect();
        if !print_table(&["id", "name", "card number"], &rows) {
            println!("  (none)");
        }
    }

    async fn cmd_groups(&self) {
        let Some(token) = self.token() else { return };
        self.groups.fetch_groups(&token).await;
        let rows: Vec<Vec<String>> = self
            .groups
            .groups()
            .iter()
            .map(|g| {
                vec![
                    g.id.to_string(),
                    g.name.clone(),
                    g.created_at.format("%Y-%m-%d").to_string(),
                    g.created_by.display_name().to_string(),
                    g.users.len().to_string(),
                ]
            })
            .collect();
        if !print_table(&["id", "name", "created", "by", "members"], &rows) {
            println!("You are not in any groups yet.");
        }
    }

    async fn cmd_group(&self, id: i64) {
        let Some(token) = self.token() else { return };
        self.groups.fetch_group(&token, id).await;
        match self.groups.current_group() {
            Some(g) => {
                println!("group: {} (id {})", g.name, g.id);
                let rows: Vec<Vec<String>> = g
                    .users
                    .iter()
                    .map(|u| vec![u.id.to_string(), u.display_name().to_string(), u.email.clone()])
                    .collect();
                if !print_table(&["id", "name", "email"], &rows) {
                    println!("No users in this group.");
                }
                let cards = g.id_cards.len() + g.student_cards.len() + g.health_care_cards.len();
                if cards == 0 {
                    println!("No cards associated with this group.");
                } else {
                    println!(
                        "cards: {} id, {} student, {} health-care",
                        g.id_cards.len(),
                        g.student_cards.len(),
                        g.health_care_cards.len()
                    );
                }
            }
            None => {
                if let Some(err) = self.groups.error() {
                    eprintln!("{}", err);
                }
            }
        }
    }

    async fn cmd_invitations(&self) {
        let Some(token) = self.token() else { return };
        self.groups.fetch_invitations(&token).await;
        let rows: Vec<Vec<String>> = self
            .groups
            .invitations()
            .iter()
            .map(|inv| {
                vec![
                    inv.id.to_string(),
                    inv.group.name.clone(),
                    format!("{} ({})", inv.sender.display_name(), inv.sender.email),
                ]
            })
            .collect();
        if !print_table(&["id", "group", "invited by"], &rows) {
            println!("No pending invitations.");
        }
    }

    fn cmd_status(&self) {
        let st = self.session.state();
        match (&st.token, &st.user) {
            (Some(_), Some(user)) => {
                println!("logged in: user_id={} (token expires {})", user.user_id, user.expires_at());
            }
            (Some(_), None) => println!("logged in (claims unavailable)"),
            (None, _) => println!("not logged in"),
        }
        if let Some(err) = &st.error {
            println!("last error: {}", err);
        }
    }
}

fn parse_id_list(s: &str) -> Vec<i64> {
    if s == "-" {
        return Vec::new();
    }
    s.split(',').filter_map(|p| p.trim().parse::<i64>().ok()).collect()
}

fn read_image_base64(path: &str) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading image {}", path))?;
    Ok(STANDARD.encode(bytes))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let program = std::env::args().next().unwrap_or_else(|| "cardwallet_cli".into());
    let mut cfg = ClientConfig::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--api" => {
                if i + 1 >= args.len() { eprintln!("--api requires a value"); print_usage(&program); std::process::exit(2); }
                cfg.base_url = args[i + 1].clone();
                i += 2;
            }
            "--credentials" => {
                if i + 1 >= args.len() { eprintln!("--credentials requires a value"); print_usage(&program); std::process::exit(2); }
                cfg.credentials_dir = args[i + 1].clone().into();
                i += 2;
            }
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }
    cfg.log_startup();

    let api = ApiClient::new(&cfg.base_url).context("building API client")?;
    let creds = CredentialStore::open(&cfg.credentials_dir).context("opening credential store")?;
    let session = SessionManager::new(api.clone(), creds);
    session.load_persisted();
    if session.view().authenticated {
        info!("restored persisted session");
    }
    // Background refresh for the lifetime of the interpreter; the guard
    // cancels the task when main returns.
    let _refresh_task = session.start_auto_refresh(Duration::from_secs(
        cfg.refresh_interval.as_secs().max(1),
    ));

    let cli = Cli {
        session: session.clone(),
        cards: CardSync::new(api.clone()),
        groups: GroupService::new(api.clone()),
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input = String::new();
    println!("cardwallet interpreter. Type 'help' for commands.");
    loop {
        input.clear();
        print!("> ");
        let _ = stdout.flush();
        if stdin.read_line(&mut input).is_err() {
            break;
        }
        if input.is_empty() {
            break; // EOF
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "quit" | "exit" => break,
            "help" => print_usage(&program),
            "status" => cli.cmd_status(),
            "login" => {
                if parts.len() != 3 {
                    eprintln!("usage: login <email> <password>");
                    continue;
                }
                match cli.session.login(parts[1], parts[2]).await {
                    Ok(()) => println!("logged in"),
                    Err(e) => eprintln!("{}", e.message()),
                }
            }
            "signup" => {
                if parts.len() != 5 {
                    eprintln!("usage: signup <first> <last> <email> <password>");
                    continue;
                }
                let req = SignupRequest {
                    first_name: parts[1].into(),
                    last_name: parts[2].into(),
                    email: parts[3].into(),
                    password: parts[4].into(),
                };
                match cli.session.signup(&req).await {
                    Ok(()) => println!("signed up and logged in"),
                    Err(e) => eprintln!("{}", e.message()),
                }
            }
            "register-company" => {
                if parts.len() != 4 {
                    eprintln!("usage: register-company <name> <vat> <email>");
                    continue;
                }
                let req = CompanyRegistration {
                    name: parts[1].into(),
                    vat_number: parts[2].into(),
                    contact_email: parts[3].into(),
                };
                match api.register_company(&req).await {
                    Ok(resp) => {
                        println!("registration successful. API key: {}", resp.api_key);
                        println!("Store this key securely; it cannot be retrieved later.");
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            "logout" => {
                cli.session.logout();
                println!("logged out");
            }
            "refresh" => match cli.session.refresh().await {
                Ok(()) => println!("token refreshed"),
                Err(e) => eprintln!("{}", e.message()),
            },
            "cards" => {
                if cli.require_auth() {
                    cli.cmd_cards().await;
                }
            }
            "upload" => {
                if !cli.require_auth() {
                    continue;
                }
                if parts.len() < 3 {
                    eprintln!("usage: upload <kind> <front-file> [back-file]");
                    continue;
                }
                let Some(kind) = CardKind::parse(parts[1]) else {
                    eprintln!("unknown card kind: {} (idcard|studentcard|healthcard)", parts[1]);
                    continue;
                };
                let front = match read_image_base64(parts[2]) {
                    Ok(b) => Some(b),
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };
                let back = match parts.get(3) {
                    Some(p) => match read_image_base64(p) {
                        Ok(b) => Some(b),
                        Err(e) => {
                            eprintln!("{}", e);
                            continue;
                        }
                    },
                    None => None,
                };
                let token = cli.token().unwrap_or_default();
                match cli.cards.upload_card(&token, kind, front, back).await {
                    Ok(()) => println!("Card successfully processed."),
                    Err(e) => eprintln!("{}", e.message()),
                }
            }
            "delete" => {
                if !cli.require_auth() {
                    continue;
                }
                if parts.len() < 3 {
                    eprintln!("usage: delete <kind> <id> [group-id]");
                    continue;
                }
                let Some(kind) = CardKind::parse(parts[1]) else {
                    eprintln!("unknown card kind: {}", parts[1]);
                    continue;
                };
                let Ok(id) = parts[2].parse::<i64>() else {
                    eprintln!("bad card id: {}", parts[2]);
                    continue;
                };
                let group_id = parts.get(3).and_then(|p| p.parse::<i64>().ok());
                let token = cli.token().unwrap_or_default();
                let refresh_due = Arc::new(AtomicBool::new(false));
                let flag = refresh_due.clone();
                let res = cli
                    .cards
                    .delete_card(&token, kind, id, group_id, move || {
                        flag.store(true, Ordering::SeqCst)
                    })
                    .await;
                match res {
                    Ok(()) => println!("deleted"),
                    Err(e) => eprintln!("{}", e.message()),
                }
                if refresh_due.load(Ordering::SeqCst) {
                    cli.cmd_cards().await;
                }
            }
            "groups" => {
                if cli.require_auth() {
                    cli.cmd_groups().await;
                }
            }
            "group" => {
                if !cli.require_auth() {
                    continue;
                }
                let Some(id) = parts.get(1).and_then(|p| p.parse::<i64>().ok()) else {
                    eprintln!("usage: group <id>");
                    continue;
                };
                cli.cmd_group(id).await;
            }
            "create-group" => {
                if !cli.require_auth() {
                    continue;
                }
                let name = parts[1..].join(" ");
                let token = cli.token().unwrap_or_default();
                cli.groups.open_create();
                match cli.groups.create_group(&token, &name).await {
                    Ok(()) => println!("group created"),
                    Err(e) => eprintln!("{}", e.message()),
                }
            }
            "add-cards" => {
                if !cli.require_auth() {
                    continue;
                }
                if parts.len() != 5 {
                    eprintln!("usage: add-cards <group-id> <id-ids> <student-ids> <health-ids>");
                    continue;
                }
                let Some(gid) = parts.get(1).and_then(|p| p.parse::<i64>().ok()) else {
                    eprintln!("bad group id: {}", parts[1]);
                    continue;
                };
                let selection = AddCardsSelection {
                    id_card_ids: parse_id_list(parts[2]),
                    student_card_ids: parse_id_list(parts[3]),
                    health_care_card_ids: parse_id_list(parts[4]),
                };
                if selection.is_empty() {
                    eprintln!("nothing selected");
                    continue;
                }
                let token = cli.token().unwrap_or_default();
                match cli.groups.add_cards_to_group(&token, gid, &selection).await {
                    Ok(()) => println!("cards added"),
                    Err(e) => eprintln!("{}", e.message()),
                }
            }
            "invitations" => {
                if cli.require_auth() {
                    cli.cmd_invitations().await;
                }
            }
            "invite" => {
                if !cli.require_auth() {
                    continue;
                }
                if parts.len() != 3 {
                    eprintln!("usage: invite <group-id> <email>");
                    continue;
                }
                let Some(gid) = parts.get(1).and_then(|p| p.parse::<i64>().ok()) else {
                    eprintln!("bad group id: {}", parts[1]);
                    continue;
                };
                let token = cli.token().unwrap_or_default();
                match cli.groups.invite(&token, gid, parts[2]).await {
                    Ok(()) => println!("Invitation sent successfully!"),
                    // server validation messages ("user already invited", ...) verbatim
                    Err(e) => eprintln!("Invite not sent: {}", e.message()),
                }
            }
            "respond" => {
                if !cli.require_auth() {
                    continue;
                }
                if parts.len() != 3 {
                    eprintln!("usage: respond <id> accept|reject");
                    continue;
                }
                let Some(id) = parts.get(1).and_then(|p| p.parse::<i64>().ok()) else {
                    eprintln!("bad invitation id: {}", parts[1]);
                    continue;
                };
                let Some(action) = InviteAction::parse(parts[2]) else {
                    eprintln!("action must be accept or reject");
                    continue;
                };
                let token = cli.token().unwrap_or_default();
                let refresh_due = Arc::new(AtomicBool::new(false));
                let flag = refresh_due.clone();
                let res = cli
                    .groups
                    .respond_invitation(&token, id, action, move || {
                        flag.store(true, Ordering::SeqCst)
                    })
                    .await;
                match res {
                    Ok(()) => println!("Invitation {}ed.", action.as_str()),
                    Err(e) => eprintln!("{}", e.message()),
                }
                if refresh_due.load(Ordering::SeqCst) {
                    cli.cmd_groups().await;
                }
            }
            unk => {
                eprintln!("unknown command: {} (try 'help')", unk);
            }
        }
    }
    Ok(())
}
