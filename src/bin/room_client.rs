use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use game_room_client::api::{CreateRoomRequest, JoinRoomRequest, ListRoomsQuery, Participation};
use game_room_client::domain::Visibility;
use game_room_client::logging::init_tracing;
use game_room_client::realtime::NoDecryption;
use game_room_client::{
    Alert, ClientConfig, ConfirmPrompt, EngineTag, HttpRoomsApi, LocalIdentity, Navigation,
    Presenter, RealtimeChannel, RoomId, RoomSessionController, RoomsApi, StaticCatalog, TableView,
    ViewConfig, WebSocketChannel,
};

const LOG_TARGET: &str = "bin::room_client";

#[derive(Parser)]
#[command(name = "room_client")]
#[command(about = "Browse, join and watch game rooms", long_about = None)]
struct Cli {
    /// Games service REST base URL
    #[arg(long, env = "GAMES_API_URL", global = true, default_value = "http://127.0.0.1:3000/api")]
    api_url: Url,

    /// Explicit realtime websocket URL (derived from the API URL otherwise)
    #[arg(long, env = "GAMES_REALTIME_URL", global = true)]
    realtime_url: Option<Url>,

    /// Bearer token for authenticated calls
    #[arg(long, env = "GAMES_API_TOKEN", global = true)]
    token: Option<String>,

    /// Local user id; omit to act as a spectator
    #[arg(long, env = "GAMES_USER_ID", global = true)]
    user_id: Option<String>,

    /// Toggle structured (JSON) logs
    #[arg(long, env = "GAMES_LOG_JSON", global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List rooms
    List(ListArgs),
    /// Create a room and print it
    Create(CreateArgs),
    /// Join a room by id or invite code
    Join(JoinArgs),
    /// Follow a room live until Ctrl-C
    Watch(WatchArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GameArg {
    ExplodingCats,
    TexasHoldem,
}

impl From<GameArg> for EngineTag {
    fn from(game: GameArg) -> Self {
        match game {
            GameArg::ExplodingCats => EngineTag::ExplodingCats,
            GameArg::TexasHoldem => EngineTag::TexasHoldem,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ParticipationArg {
    All,
    Joined,
    Hosted,
}

#[derive(Parser, Debug)]
struct ListArgs {
    #[arg(long, value_enum)]
    game: Option<GameArg>,

    #[arg(long, value_enum)]
    participation: Option<ParticipationArg>,
}

#[derive(Parser, Debug)]
struct CreateArgs {
    #[arg(long, value_enum, default_value = "exploding-cats")]
    game: GameArg,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    private: bool,

    #[arg(long)]
    max_players: Option<u16>,
}

#[derive(Parser, Debug)]
struct JoinArgs {
    /// Room id to join
    #[arg(long, conflicts_with = "invite", required_unless_present = "invite")]
    room: Option<String>,

    /// Invite code for a private room
    #[arg(long)]
    invite: Option<String>,
}

#[derive(Parser, Debug)]
struct WatchArgs {
    room_id: String,

    /// Number of log lines to show
    #[arg(long, default_value_t = 5)]
    log_lines: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.json)?;

    let realtime_url = match cli.realtime_url.clone() {
        Some(url) => url,
        None => derive_realtime_url(&cli.api_url)?,
    };
    let config = ClientConfig::new(cli.api_url.clone(), realtime_url);
    let mut api = HttpRoomsApi::new(config.api_base.clone(), config.request_timeout)
        .context("failed to build http client")?;
    if let Some(token) = cli.token.clone() {
        api = api.with_token(token);
    }
    let api: Arc<dyn RoomsApi> = Arc::new(api);
    let identity = cli.user_id.clone().map(LocalIdentity::new);

    match cli.command {
        Command::List(args) => run_list(api.as_ref(), args).await,
        Command::Create(args) => run_create(api.as_ref(), args).await,
        Command::Join(args) => run_join(api.as_ref(), args).await,
        Command::Watch(args) => run_watch(config, api, identity, args).await,
    }
}

fn load_dotenv() {
    let manifest_env_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".env");
    dotenv::from_filename(manifest_env_path).ok();
    dotenv::dotenv().ok();
}

/// `https://host/api` becomes `wss://host/realtime`.
fn derive_realtime_url(api_base: &Url) -> Result<Url> {
    let mut url = api_base.clone();
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(anyhow!("cannot derive a websocket url from scheme `{other}`")),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("failed to convert api url scheme"))?;
    url.set_path("/realtime");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn write_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    handle.write_all(b"\n")?;
    Ok(())
}

async fn run_list(api: &dyn RoomsApi, args: ListArgs) -> Result<()> {
    let query = ListRoomsQuery {
        game_type: args.game.map(EngineTag::from),
        participation: args.participation.map(|p| match p {
            ParticipationArg::All => Participation::All,
            ParticipationArg::Joined => Participation::Joined,
            ParticipationArg::Hosted => Participation::Hosted,
        }),
        ..ListRoomsQuery::default()
    };
    let rooms = api.list_rooms(&query).await.context("failed to list rooms")?;
    write_json(&rooms)
}

async fn run_create(api: &dyn RoomsApi, args: CreateArgs) -> Result<()> {
    let mut request = CreateRoomRequest::new(args.game.into());
    request.name = args.name;
    if args.private {
        request.visibility = Visibility::Private;
    }
    if let Some(max) = args.max_players {
        request.max_players = max;
    }
    let room = api.create_room(&request).await.context("failed to create room")?;
    info!(target: LOG_TARGET, room_id = %room.id, "room created");
    write_json(&room)
}

async fn run_join(api: &dyn RoomsApi, args: JoinArgs) -> Result<()> {
    let request = match (args.room, args.invite) {
        (Some(room), _) => JoinRoomRequest::ById {
            room_id: RoomId::new(room),
        },
        (None, Some(invite_code)) => JoinRoomRequest::ByInvite { invite_code },
        (None, None) => return Err(anyhow!("either --room or --invite is required")),
    };
    let room = api.join_room(&request).await.context("failed to join room")?;
    write_json(&room)
}

/// Prints prompts to the terminal. Destructive prompts are never raised by
/// `watch`, so confirmation always declines.
struct TerminalPresenter;

#[async_trait]
impl Presenter for TerminalPresenter {
    async fn confirm(&self, _prompt: ConfirmPrompt) -> bool {
        false
    }

    fn alert(&self, alert: Alert) {
        println!("! {}", describe_alert(&alert));
    }

    async fn blocking_alert(&self, alert: Alert) {
        println!("! {}", describe_alert(&alert));
    }

    fn toast(&self, message: String) {
        println!("~ {message}");
    }

    fn navigate(&self, to: Navigation) {
        match to {
            Navigation::Lobby => println!("-> lobby"),
            Navigation::Game { room_id, .. } => println!("-> game {room_id}"),
        }
    }
}

fn describe_alert(alert: &Alert) -> String {
    match alert {
        Alert::SignInRequired => "sign in required".to_string(),
        Alert::RoomDeleted => "the room was deleted".to_string(),
        Alert::LeaveFailed(reason) => format!("could not leave: {reason}"),
        Alert::DeleteFailed(reason) => format!("could not delete: {reason}"),
        Alert::StartFailed(reason) => format!("could not start: {reason}"),
    }
}

async fn run_watch(
    config: ClientConfig,
    api: Arc<dyn RoomsApi>,
    identity: Option<LocalIdentity>,
    args: WatchArgs,
) -> Result<()> {
    let room_id = RoomId::new(args.room_id);
    if room_id.is_empty() {
        return Err(anyhow!("room id must not be empty"));
    }
    let stop = CancellationToken::new();
    let transport = Arc::new(WebSocketChannel::new(config.websocket(), stop.clone()));
    let mut channel = RealtimeChannel::open(
        transport,
        room_id.clone(),
        identity.clone(),
        Arc::new(NoDecryption),
    )
    .await
    .context("failed to open realtime channel")?;

    let mut controller = RoomSessionController::new(
        room_id,
        identity,
        api,
        Arc::new(TerminalPresenter),
        Arc::new(StaticCatalog::new()),
    );
    let view_config = config.with_log_limit(args.log_lines).view();

    tokio::select! {
        _ = controller.run_with(&mut channel, |c| print_view(c, &view_config)) => {}
        _ = tokio::signal::ctrl_c() => {
            info!(target: LOG_TARGET, "interrupted");
        }
    }
    channel.close();
    stop.cancel();
    Ok(())
}

fn print_view(controller: &RoomSessionController, config: &ViewConfig) {
    let state = controller.state();
    if let Some(error) = &state.error {
        println!("room {}: {error}", controller.room_id());
        return;
    }
    let Some(view) = controller.view(config) else {
        return;
    };
    let members = controller.room().map(|r| r.members.len()).unwrap_or(0);
    let status = view
        .session_status
        .map(|s| format!("{s:?}").to_lowercase())
        .unwrap_or_else(|| "no session".to_string());
    println!(
        "room {} | {members} members | {status}{}",
        view.room_id,
        if view.is_host { " | host" } else { "" }
    );
    if let Some(error) = &view.snapshot_error {
        println!("  snapshot unavailable: {error}");
    }
    match &view.table {
        Some(TableView::Kittens(table)) => {
            println!(
                "  exploding cats | deck {} | turn {} | {}",
                table.deck_count,
                table
                    .turn
                    .current_player
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "-".into()),
                if table.turn.can_act { "your move" } else { "waiting" }
            );
            for line in &table.logs {
                println!("    {}", line.message);
            }
        }
        Some(TableView::Holdem(table)) => {
            println!(
                "  hold'em {:?} | pot {} | board {}",
                table.stage,
                table.pot,
                table.community_cards.join(" ")
            );
            for line in &table.logs {
                println!("    {}", line.message);
            }
        }
        None => {}
    }
}
