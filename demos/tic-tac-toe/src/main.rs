use plank::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::signal;

// ---------------------------------------------------------------------------
// Tic-tac-toe
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Cell {
    Empty,
    X,
    O,
}

/// Seats fill in order of first move: the first participant to play is X,
/// the next distinct one is O. Everyone else spectates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Board {
    cells: [[Cell; 3]; 3],
    players: Vec<ParticipantId>,
    turn: usize,
    winner: Option<ParticipantId>,
    draw: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Move {
    pub row: usize,
    pub col: usize,
}

struct TicTacToe;

impl TicTacToe {
    fn seat_of(board: &Board, participant: &ParticipantId) -> Option<usize> {
        board.players.iter().position(|p| p == participant)
    }
}

impl GameLogic for TicTacToe {
    type State = Board;
    type Action = Move;

    fn init() -> Board {
        Board {
            cells: [[Cell::Empty; 3]; 3],
            players: Vec::new(),
            turn: 0,
            winner: None,
            draw: false,
        }
    }

    fn validate(board: &Board, participant: &ParticipantId, mv: &Move) -> Result<(), String> {
        if board.winner.is_some() || board.draw {
            return Err("game is over".into());
        }
        match Self::seat_of(board, participant) {
            Some(seat) if seat != board.turn => return Err("not your turn".into()),
            None if board.players.len() == 2 => return Err("game is full".into()),
            _ => {}
        }
        if mv.row >= 3 || mv.col >= 3 {
            return Err("row and col must be 0-2".into());
        }
        if board.cells[mv.row][mv.col] != Cell::Empty {
            return Err("cell is occupied".into());
        }
        Ok(())
    }

    fn apply(board: &mut Board, participant: &ParticipantId, mv: Move) -> bool {
        if Self::seat_of(board, participant).is_none() {
            board.players.push(participant.clone());
        }

        let mark = if board.turn == 0 { Cell::X } else { Cell::O };
        board.cells[mv.row][mv.col] = mark;

        if check_winner(&board.cells, mark) {
            board.winner = Some(participant.clone());
        } else if board_full(&board.cells) {
            board.draw = true;
        } else {
            board.turn = 1 - board.turn;
        }
        true
    }
}

fn check_winner(b: &[[Cell; 3]; 3], m: Cell) -> bool {
    (0..3).any(|i| (0..3).all(|j| b[i][j] == m))
        || (0..3).any(|j| (0..3).all(|i| b[i][j] == m))
        || (0..3).all(|i| b[i][i] == m)
        || (0..3).all(|i| b[i][2 - i] == m)
}

fn board_full(b: &[[Cell; 3]; 3]) -> bool {
    b.iter().all(|row| row.iter().all(|c| *c != Cell::Empty))
}

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct Count {
    value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Increment,
    Decrement,
}

struct Counter;

impl GameLogic for Counter {
    type State = Count;
    type Action = Step;

    fn init() -> Count {
        Count { value: 0 }
    }

    fn apply(count: &mut Count, _participant: &ParticipantId, step: Step) -> bool {
        match step {
            Step::Increment => count.value += 1,
            Step::Decrement => count.value -= 1,
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

fn engines() -> EngineRegistry {
    EngineRegistry::new()
        .register("tictactoe", LogicEngine::<TicTacToe>::new)
        .register("counter", LogicEngine::<Counter>::new)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("plank=debug,tic_tac_toe=debug,tower_http=debug");

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind_address = %config.bind_address,
        data_dir = ?config.data_dir,
        "starting tic-tac-toe server"
    );

    let server = PlankServerBuilder::from_config(config)
        .build(engines())
        .await?;
    server.run_until(shutdown_signal()).await?;
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("received SIGINT, shutting down"),
            Err(e) => tracing::error!(error = %e, "failed to listen for SIGINT"),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use futures_util::{SinkExt, StreamExt};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tower::ServiceExt;

    use super::*;

    type Ws = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    fn alice() -> ParticipantId {
        ParticipantId::from("user_alice")
    }

    fn bob() -> ParticipantId {
        ParticipantId::from("user_bob")
    }

    fn play(board: &mut Board, who: &ParticipantId, row: usize, col: usize) {
        let mv = Move { row, col };
        TicTacToe::validate(board, who, &mv).expect("move should be legal");
        assert!(TicTacToe::apply(board, who, mv));
    }

    // =====================================================================
    // Rules
    // =====================================================================

    #[test]
    fn test_validate_rejects_out_of_bounds() {
        let board = TicTacToe::init();
        let r = TicTacToe::validate(&board, &alice(), &Move { row: 3, col: 0 });
        assert!(r.unwrap_err().contains("0-2"));
    }

    #[test]
    fn test_validate_rejects_occupied_cell() {
        let mut board = TicTacToe::init();
        play(&mut board, &alice(), 0, 0);
        let r = TicTacToe::validate(&board, &bob(), &Move { row: 0, col: 0 });
        assert!(r.unwrap_err().contains("occupied"));
    }

    #[test]
    fn test_validate_rejects_wrong_turn() {
        let mut board = TicTacToe::init();
        play(&mut board, &alice(), 0, 0);
        let r = TicTacToe::validate(&board, &alice(), &Move { row: 1, col: 1 });
        assert!(r.unwrap_err().contains("not your turn"));
    }

    #[test]
    fn test_validate_rejects_third_player() {
        let mut board = TicTacToe::init();
        play(&mut board, &alice(), 0, 0);
        play(&mut board, &bob(), 1, 1);
        let carol = ParticipantId::from("user_carol");
        let r = TicTacToe::validate(&board, &carol, &Move { row: 2, col: 2 });
        assert!(r.unwrap_err().contains("full"));
    }

    #[test]
    fn test_validate_rejects_after_game_over() {
        let mut board = TicTacToe::init();
        board.winner = Some(alice());
        let r = TicTacToe::validate(&board, &bob(), &Move { row: 1, col: 1 });
        assert!(r.unwrap_err().contains("game is over"));
    }

    #[test]
    fn test_first_movers_take_seats_in_order() {
        let mut board = TicTacToe::init();
        play(&mut board, &bob(), 0, 0);
        play(&mut board, &alice(), 1, 1);
        assert_eq!(board.players, vec![bob(), alice()]);
        assert_eq!(board.cells[0][0], Cell::X);
        assert_eq!(board.cells[1][1], Cell::O);
    }

    #[test]
    fn test_x_wins_top_row() {
        let mut board = TicTacToe::init();
        play(&mut board, &alice(), 0, 0);
        play(&mut board, &bob(), 1, 0);
        play(&mut board, &alice(), 0, 1);
        play(&mut board, &bob(), 1, 1);
        play(&mut board, &alice(), 0, 2);
        assert_eq!(board.winner, Some(alice()));
    }

    #[test]
    fn test_full_board_is_a_draw() {
        // X O X
        // X O X
        // O X O
        let mut board = TicTacToe::init();
        for (who, row, col) in [
            (alice(), 0, 0),
            (bob(), 0, 1),
            (alice(), 0, 2),
            (bob(), 1, 1),
            (alice(), 1, 0),
            (bob(), 2, 0),
            (alice(), 1, 2),
            (bob(), 2, 2),
            (alice(), 2, 1),
        ] {
            play(&mut board, &who, row, col);
        }
        assert!(board.draw);
        assert_eq!(board.winner, None);
    }

    #[test]
    fn test_win_detection_all_lines() {
        for row in 0..3 {
            let mut b = [[Cell::Empty; 3]; 3];
            for col in 0..3 {
                b[row][col] = Cell::X;
            }
            assert!(check_winner(&b, Cell::X), "row {row}");
        }
        for col in 0..3 {
            let mut b = [[Cell::Empty; 3]; 3];
            for row in 0..3 {
                b[row][col] = Cell::O;
            }
            assert!(check_winner(&b, Cell::O), "col {col}");
        }
        let mut b = [[Cell::Empty; 3]; 3];
        for i in 0..3 {
            b[i][i] = Cell::X;
        }
        assert!(check_winner(&b, Cell::X), "main diagonal");

        let mut b = [[Cell::Empty; 3]; 3];
        for i in 0..3 {
            b[i][2 - i] = Cell::O;
        }
        assert!(check_winner(&b, Cell::O), "anti-diagonal");
    }

    #[test]
    fn test_counter_steps() {
        let mut engine = LogicEngine::<Counter>::new();
        let start = engine.initial_state();
        let pid = alice();

        let up = engine.apply(&start, &pid, json!("increment"));
        assert_eq!(up, vec![json!({ "value": 1 })]);
        let down = engine.apply(&up[0], &pid, json!("decrement"));
        assert_eq!(down, vec![json!({ "value": 0 })]);
        assert!(engine.apply(&start, &pid, json!("reset")).is_empty());
    }

    // =====================================================================
    // Over the wire
    // =====================================================================

    async fn get(app: &axum::Router, uri: &str, bearer: Option<&Nonce>) -> Value {
        let mut request = Request::builder().uri(uri);
        if let Some(nonce) = bearer {
            request = request.header("authorization", format!("Bearer {}", nonce.as_str()));
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn join(addr: &str, key: &SessionKey, nonce: &Nonce) -> Ws {
        let mut request = format!("ws://{addr}/game/connect/{key}")
            .into_client_request()
            .unwrap();
        request.headers_mut().insert(
            "authorization",
            format!("Bearer {}", nonce.as_str()).parse().unwrap(),
        );
        let (mut ws, _) = tokio_tungstenite::connect_async(request).await.unwrap();
        assert!(matches!(recv(&mut ws).await, ServerFrame::Connected(_)));
        ws
    }

    async fn recv(ws: &mut Ws) -> ServerFrame {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timeout")
            .unwrap()
            .unwrap();
        serde_json::from_slice(&msg.into_data()).unwrap()
    }

    async fn send_move(ws: &mut Ws, row: usize, col: usize) {
        let frame = json!({ "action": { "row": row, "col": col } });
        ws.send(Message::text(frame.to_string())).await.unwrap();
    }

    fn board(frame: ServerFrame) -> Board {
        match frame {
            ServerFrame::State(state) => serde_json::from_value(state).unwrap(),
            other => panic!("expected state, got {other:?}"),
        }
    }

    async fn both(px: &mut Ws, po: &mut Ws) {
        board(recv(px).await);
        board(recv(po).await);
    }

    #[tokio::test]
    async fn test_two_players_finish_a_game() {
        let server = PlankServerBuilder::new()
            .bind("127.0.0.1:0")
            .build(engines())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap().to_string();
        let app = server.router();
        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let x: GuestLogin = serde_json::from_value(get(&app, "/login/guest", None).await).unwrap();
        let o: GuestLogin = serde_json::from_value(get(&app, "/login/guest", None).await).unwrap();
        let created: SessionCreated =
            serde_json::from_value(get(&app, "/game/new/tictactoe", Some(&x.nonce)).await)
                .unwrap();
        let key = created.session_key;

        let mut px = join(&addr, &key, &x.nonce).await;
        let mut po = join(&addr, &key, &o.nonce).await;

        send_move(&mut px, 0, 0).await;
        board(recv(&mut px).await);
        board(recv(&mut po).await);

        // X moving twice in a row produces nothing.
        send_move(&mut px, 2, 2).await;

        send_move(&mut po, 1, 0).await;
        both(&mut px, &mut po).await;
        send_move(&mut px, 0, 1).await;
        both(&mut px, &mut po).await;
        send_move(&mut po, 1, 1).await;
        both(&mut px, &mut po).await;

        send_move(&mut px, 0, 2).await;
        let final_x = board(recv(&mut px).await);
        let final_o = board(recv(&mut po).await);
        assert_eq!(final_x.winner, Some(x.participant_id.clone()));
        assert_eq!(final_o.players, vec![x.participant_id, o.participant_id]);
        assert_eq!(final_o.cells[2][2], Cell::Empty);
    }
}
