use super::{AcademyPortalClient, PortalError, Result, send_graphql};
use crate::scene::{Frame, InitialState};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

const LIST_BOARDS: &str = "query TacticalBoards($categoryId: ID) {
  tacticalBoards(categoryId: $categoryId) { id title description categoryId updatedAt }
}";

const GET_BOARD: &str = "query TacticalBoard($id: ID!) {
  tacticalBoard(id: $id) { id title description categoryId updatedAt initialState animation }
}";

const CREATE_BOARD: &str = "mutation CreateTacticalBoard($input: TacticalBoardInput!) {
  createTacticalBoard(input: $input) { id title description categoryId updatedAt }
}";

const UPDATE_BOARD: &str = "mutation UpdateTacticalBoard($id: ID!, $input: TacticalBoardInput!) {
  updateTacticalBoard(id: $id, input: $input) { id title description categoryId updatedAt }
}";

const DELETE_BOARD: &str = "mutation DeleteTacticalBoard($id: ID!) {
  deleteTacticalBoard(id: $id)
}";

/// The saved scene and animation travel as JSON text inside the GraphQL
/// document. Older boards were stored as raw objects, so both are accepted.
mod embedded_json {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned};

    pub fn serialize<T: Serialize, S: Serializer>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let text = serde_json::to_string(value).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, T: DeserializeOwned + Default, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<T, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(T::default()),
            serde_json::Value::String(text) if text.is_empty() => Ok(T::default()),
            serde_json::Value::String(text) => {
                serde_json::from_str(&text).map_err(serde::de::Error::custom)
            }
            other => serde_json::from_value(other).map_err(serde::de::Error::custom),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticalBoardSummary {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticalBoardRecord {
    #[serde(flatten)]
    pub summary: TacticalBoardSummary,
    #[serde(with = "embedded_json", default)]
    pub initial_state: InitialState,
    #[serde(with = "embedded_json", default)]
    pub animation: Vec<Frame>,
}

/// What gets written by the create and update mutations
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TacticalBoardInput {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    #[serde(with = "embedded_json")]
    pub initial_state: InitialState,
    #[serde(with = "embedded_json")]
    pub animation: Vec<Frame>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    #[serde(rename = "tacticalBoards")]
    boards: Vec<TacticalBoardSummary>,
}

#[derive(Debug, Deserialize)]
struct GetData {
    #[serde(rename = "tacticalBoard")]
    board: Option<TacticalBoardRecord>,
}

#[derive(Debug, Deserialize)]
struct CreateData {
    #[serde(rename = "createTacticalBoard")]
    board: TacticalBoardSummary,
}

#[derive(Debug, Deserialize)]
struct UpdateData {
    #[serde(rename = "updateTacticalBoard")]
    board: TacticalBoardSummary,
}

#[derive(Debug, Deserialize)]
struct DeleteData {
    #[serde(rename = "deleteTacticalBoard")]
    deleted: bool,
}

impl AcademyPortalClient {
    pub fn tactical_boards(
        &self,
        category_id: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<TacticalBoardSummary>>> + use<> {
        let request = self.graphql_request(LIST_BOARDS, json!({ "categoryId": category_id }));

        async move {
            let data: ListData = send_graphql(request, "tacticalBoards").await?;
            Ok(data.boards)
        }
    }

    pub fn tactical_board(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<TacticalBoardRecord>> + use<> {
        let request = self.graphql_request(GET_BOARD, json!({ "id": id }));
        let id = id.to_string();

        async move {
            let data: GetData = send_graphql(request, "tacticalBoard").await?;
            data.board
                .ok_or_else(|| PortalError::NotFound(format!("Tactical board {id}")))
        }
    }

    pub fn create_tactical_board(
        &self,
        input: &TacticalBoardInput,
    ) -> impl std::future::Future<Output = Result<TacticalBoardSummary>> + use<> {
        let request = self.graphql_request(CREATE_BOARD, json!({ "input": input }));

        async move {
            let data: CreateData = send_graphql(request, "createTacticalBoard").await?;
            info!("academy portal created tactical board {}", data.board.id);
            Ok(data.board)
        }
    }

    pub fn update_tactical_board(
        &self,
        id: &str,
        input: &TacticalBoardInput,
    ) -> impl std::future::Future<Output = Result<TacticalBoardSummary>> + use<> {
        let request = self.graphql_request(UPDATE_BOARD, json!({ "id": id, "input": input }));

        async move {
            let data: UpdateData = send_graphql(request, "updateTacticalBoard").await?;
            info!("academy portal updated tactical board {}", data.board.id);
            Ok(data.board)
        }
    }

    pub fn delete_tactical_board(
        &self,
        id: &str,
    ) -> impl std::future::Future<Output = Result<bool>> + use<> {
        let request = self.graphql_request(DELETE_BOARD, json!({ "id": id }));

        async move {
            let data: DeleteData = send_graphql(request, "deleteTacticalBoard").await?;
            Ok(data.deleted)
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::{parse_graphql_response, test::request_body, test::test_client};
    use super::*;
    use crate::{
        board::TacticalBoard,
        config::Board as BoardConfig,
        scene::{Point, Stroke, Token, TokenKind},
    };
    use time::macros::datetime;

    fn sample_input() -> TacticalBoardInput {
        let token = Token::new("t1".to_string(), TokenKind::Ball, String::new(), 50.0, 40.0);
        let frame = Frame {
            tokens: vec![token.clone()],
            strokes: vec![],
            current_stroke: Some(Stroke::new("#000".to_string(), Point::new(1.0, 2.0))),
        };
        TacticalBoardInput {
            title: "Corner drill".to_string(),
            description: None,
            category_id: Some("u12".to_string()),
            initial_state: InitialState {
                tokens: vec![token],
                strokes: vec![],
            },
            animation: vec![frame],
        }
    }

    #[test]
    fn test_embedded_json_keeps_exact_positions() {
        let mut board = TacticalBoard::with_seed(BoardConfig::default(), 5);
        for kind in [TokenKind::TeamA, TokenKind::TeamB, TokenKind::Ball] {
            board.add_token(kind).unwrap();
        }
        let input = TacticalBoardInput {
            initial_state: board.initial_state(),
            ..sample_input()
        };

        let text = serde_json::to_string(&input).unwrap();
        let parsed: TacticalBoardInput = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, input);

        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["id"] = json!("b1");
        let record: TacticalBoardRecord = serde_json::from_value(value).unwrap();
        assert_eq!(record.initial_state, input.initial_state);
        assert_eq!(record.animation, input.animation);
    }

    #[test]
    fn test_create_body_embeds_json_text() {
        let client = test_client(Some("tok"));
        let input = sample_input();
        let body = request_body(client.graphql_request(CREATE_BOARD, json!({ "input": &input })));

        let variables = &body["variables"]["input"];
        assert_eq!(variables["title"], "Corner drill");
        assert_eq!(variables["categoryId"], "u12");
        assert!(variables.get("description").is_none());

        let initial: InitialState =
            serde_json::from_str(variables["initialState"].as_str().unwrap()).unwrap();
        assert_eq!(initial, input.initial_state);
        let animation: Vec<Frame> =
            serde_json::from_str(variables["animation"].as_str().unwrap()).unwrap();
        assert_eq!(animation, input.animation);
    }

    #[test]
    fn test_parse_board_with_text_payload() {
        let body = r#"{"data":{"tacticalBoard":{
            "id":"b1","title":"Press","description":null,"categoryId":null,
            "updatedAt":"2026-03-01T10:00:00Z",
            "initialState":"{\"tokens\":[{\"id\":\"a\",\"type\":\"team-a\",\"label\":\"1\",\"x\":20,\"y\":30}],\"strokes\":[]}",
            "animation":"[]"
        }}}"#;
        let data: GetData = parse_graphql_response(body, "tacticalBoard").unwrap();
        let board = data.board.unwrap();
        assert_eq!(board.summary.id, "b1");
        assert_eq!(board.summary.updated_at, Some(datetime!(2026-03-01 10:00:00 UTC)));
        assert_eq!(board.initial_state.tokens.len(), 1);
        assert_eq!(board.initial_state.tokens[0].kind, TokenKind::TeamA);
        assert!(board.animation.is_empty());
    }

    #[test]
    fn test_parse_board_with_object_payload() {
        let body = r#"{"data":{"tacticalBoard":{
            "id":"b2","title":"Build up",
            "initialState":{"tokens":[],"strokes":[{"color":"red","points":[{"x":1,"y":1}]}]},
            "animation":null
        }}}"#;
        let data: GetData = parse_graphql_response(body, "tacticalBoard").unwrap();
        let board = data.board.unwrap();
        assert_eq!(board.summary.updated_at, None);
        assert_eq!(board.initial_state.strokes.len(), 1);
        assert!(board.animation.is_empty());
    }

    #[test]
    fn test_parse_missing_board() {
        let data: GetData =
            parse_graphql_response(r#"{"data":{"tacticalBoard":null}}"#, "tacticalBoard").unwrap();
        assert!(data.board.is_none());
    }

    #[test]
    fn test_parse_list() {
        let body = r#"{"data":{"tacticalBoards":[
            {"id":"1","title":"A","categoryId":"u10"},
            {"id":"2","title":"B","description":"Set piece","updatedAt":null}
        ]}}"#;
        let data: ListData = parse_graphql_response(body, "tacticalBoards").unwrap();
        assert_eq!(data.boards.len(), 2);
        assert_eq!(data.boards[0].category_id.as_deref(), Some("u10"));
        assert_eq!(data.boards[1].description.as_deref(), Some("Set piece"));
    }

    #[test]
    fn test_parse_delete() {
        let data: DeleteData =
            parse_graphql_response(r#"{"data":{"deleteTacticalBoard":true}}"#, "delete").unwrap();
        assert!(data.deleted);
    }
}
