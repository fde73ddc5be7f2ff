use std::sync::Arc;

use axum::{
	Json, Router,
	body::Bytes,
	extract::{
		DefaultBodyLimit, FromRequest, FromRequestParts, Multipart, Path, Query, Request, State,
		multipart::MultipartError,
		rejection::{JsonRejection, PathRejection, QueryRejection},
	},
	http::{HeaderMap, HeaderValue, Method, StatusCode, header, request::Parts},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{delete, get, patch, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tower_http::{
	cors::{AllowOrigin, CorsLayer},
	trace::TraceLayer,
};
use uuid::Uuid;

use crate::state::AppState;
use mmp_service::{
	ActionItemDraft, ActionItemPatch, ActionItemQuery, ActionItemView, AiGenerateRequest,
	AnalyzeScreenshotRequest, AudioUpload, ClassificationResponse, ClassifyRequest, Error,
	IdentifySpeakersRequest, MeetingDraft, MeetingInput, MeetingListQuery, MeetingSummary,
	MeetingView, ProjectRequest, ProjectView, ProviderStats, ReorderRequest, ScreenshotUpload,
	ScreenshotView, SpeakerIdentification, TranscriptionResponse, VersionView,
};

const JSON_DATA_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";
/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1_024;

pub fn router(state: AppState) -> Router {
	let cfg = &state.service.cfg;
	let body_limit = cfg.storage.max_upload_bytes as usize + MULTIPART_OVERHEAD_BYTES;
	let cors = cors_layer(&cfg.service.cors_allowed_origins);
	let auth_token: Option<Arc<str>> = cfg.security.api_auth_token.as_deref().map(Arc::from);
	let api = Router::new()
		.route("/api/meetings", get(list_meetings).post(create_meeting))
		.route("/api/meetings/ai-generate", post(ai_generate))
		.route("/api/meetings/import", post(import_docx))
		.route("/api/meetings/{id}", get(get_meeting).put(update_meeting).delete(delete_meeting))
		.route("/api/meetings/{id}/export", get(export_meeting))
		.route("/api/meetings/{id}/versions", get(list_versions))
		.route("/api/meetings/{id}/reorder", post(reorder))
		.route("/api/meetings/{id}/summarize", post(summarize))
		.route("/api/meetings/{id}/classify", post(classify))
		.route("/api/clipboard/parse", post(parse_clipboard))
		.route("/api/screenshots/upload", post(upload_screenshot))
		.route("/api/screenshots/analyze", post(analyze_screenshot))
		.route("/api/screenshots/identify-speakers", post(identify_speakers))
		.route("/api/action-items", get(list_action_items))
		.route("/api/action-items/{id}", patch(update_action_item))
		.route("/api/projects", get(list_projects).post(register_project))
		.route("/api/projects/{id}", delete(delete_project))
		.route("/api/ai/transcribe", post(transcribe))
		.route("/api/ai/action-items", post(extract_action_items))
		.route("/api/ai/stats", get(ai_stats))
		.route_layer(middleware::from_fn_with_state(auth_token, auth_middleware));

	Router::new()
		.route("/health", get(health))
		.merge(api)
		.layer(DefaultBodyLimit::max(body_limit))
		.layer(cors)
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn list_meetings(
	State(state): State<AppState>,
	ApiQuery(query): ApiQuery<MeetingListQuery>,
) -> Result<Json<Vec<MeetingSummary>>, ApiError> {
	let response = state.service.list_meetings(query).await?;

	Ok(Json(response))
}

async fn create_meeting(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<MeetingInput>,
) -> Result<(StatusCode, Json<MeetingView>), ApiError> {
	let response = state.service.create_meeting(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn get_meeting(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
) -> Result<Json<MeetingView>, ApiError> {
	let response = state.service.get_meeting(meeting_id).await?;

	Ok(Json(response))
}

async fn update_meeting(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
	ApiJson(payload): ApiJson<MeetingInput>,
) -> Result<Json<MeetingView>, ApiError> {
	let response = state.service.update_meeting(meeting_id, payload).await?;

	Ok(Json(response))
}

async fn delete_meeting(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
	state.service.delete_meeting(meeting_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn export_meeting(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
	headers: HeaderMap,
) -> Result<Response, ApiError> {
	let document = state.service.export_docx(meeting_id).await?;
	let cached = headers
		.get(header::IF_NONE_MATCH)
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| value.split(',').any(|tag| tag.trim() == document.etag));

	if cached {
		return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, document.etag)]).into_response());
	}

	let disposition = format!("attachment; filename=\"{}\"", document.file_name);

	Ok((
		[
			(header::CONTENT_TYPE, document.content_type.to_string()),
			(header::CONTENT_DISPOSITION, disposition),
			(header::ETAG, document.etag),
		],
		document.bytes,
	)
		.into_response())
}

async fn list_versions(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
) -> Result<Json<Vec<VersionView>>, ApiError> {
	let response = state.service.list_versions(meeting_id).await?;

	Ok(Json(response))
}

async fn reorder(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
	ApiJson(payload): ApiJson<ReorderRequest>,
) -> Result<Json<MeetingView>, ApiError> {
	let response = state.service.reorder(meeting_id, payload).await?;

	Ok(Json(response))
}

async fn summarize(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
) -> Result<Json<MeetingView>, ApiError> {
	let response = state.service.summarize_meeting(meeting_id).await?;

	Ok(Json(response))
}

/// The body is optional; an empty one means keyword matching.
async fn classify(
	State(state): State<AppState>,
	ApiPath(meeting_id): ApiPath<Uuid>,
	body: Bytes,
) -> Result<Json<ClassificationResponse>, ApiError> {
	let payload: ClassifyRequest = json_or_default(&body)?;
	let response = state.service.classify_meeting(meeting_id, payload).await?;

	Ok(Json(response))
}

async fn ai_generate(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<AiGenerateRequest>,
) -> Result<Json<MeetingDraft>, ApiError> {
	let response = state.service.ai_generate(payload).await?;

	Ok(Json(response))
}

/// Takes the raw `.docx` bytes as the body.
async fn import_docx(
	State(state): State<AppState>,
	body: Bytes,
) -> Result<Json<MeetingDraft>, ApiError> {
	if body.is_empty() {
		return Err(ApiError::invalid_field("$.file", "A .docx body is required."));
	}

	let response = state.service.import_docx(&body)?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct TextRequest {
	#[serde(default)]
	text: String,
}

async fn parse_clipboard(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<TextRequest>,
) -> Result<Json<MeetingDraft>, ApiError> {
	if payload.text.trim().is_empty() {
		return Err(ApiError::invalid_field("$.text", "text is required."));
	}

	Ok(Json(state.service.parse_clipboard(&payload.text)))
}

async fn upload_screenshot(
	State(state): State<AppState>,
	multipart: Multipart,
) -> Result<(StatusCode, Json<ScreenshotView>), ApiError> {
	let file = read_file_field(multipart).await?;
	let response = state
		.service
		.upload_screenshot(ScreenshotUpload {
			file_name: file.file_name,
			content_type: file.content_type,
			bytes: file.bytes,
		})
		.await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn analyze_screenshot(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<AnalyzeScreenshotRequest>,
) -> Result<Json<MeetingDraft>, ApiError> {
	let response = state.service.analyze_screenshot(payload).await?;

	Ok(Json(response))
}

async fn identify_speakers(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<IdentifySpeakersRequest>,
) -> Result<Json<SpeakerIdentification>, ApiError> {
	let response = state.service.identify_speakers(payload).await?;

	Ok(Json(response))
}

async fn list_action_items(
	State(state): State<AppState>,
	ApiQuery(query): ApiQuery<ActionItemQuery>,
) -> Result<Json<Vec<ActionItemView>>, ApiError> {
	let response = state.service.list_action_items(query).await?;

	Ok(Json(response))
}

async fn update_action_item(
	State(state): State<AppState>,
	ApiPath(action_item_id): ApiPath<Uuid>,
	ApiJson(payload): ApiJson<ActionItemPatch>,
) -> Result<Json<ActionItemView>, ApiError> {
	let response = state.service.update_action_item(action_item_id, payload).await?;

	Ok(Json(response))
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectView>>, ApiError> {
	let response = state.service.list_projects().await?;

	Ok(Json(response))
}

async fn register_project(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<ProjectRequest>,
) -> Result<(StatusCode, Json<ProjectView>), ApiError> {
	let response = state.service.register_project(payload).await?;

	Ok((StatusCode::CREATED, Json(response)))
}

async fn delete_project(
	State(state): State<AppState>,
	ApiPath(project_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
	state.service.delete_project(project_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn transcribe(
	State(state): State<AppState>,
	multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ApiError> {
	let file = read_file_field(multipart).await?;
	let response = state
		.service
		.transcribe(AudioUpload {
			file_name: file.file_name,
			content_type: file.content_type,
			bytes: file.bytes,
		})
		.await?;

	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ActionItemsResponse {
	action_items: Vec<ActionItemDraft>,
}

async fn extract_action_items(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<TextRequest>,
) -> Result<Json<ActionItemsResponse>, ApiError> {
	let action_items = state.service.extract_action_items(&payload.text).await?;

	Ok(Json(ActionItemsResponse { action_items }))
}

#[derive(Debug, Serialize)]
struct StatsResponse {
	providers: Vec<ProviderStats>,
}

async fn ai_stats(State(state): State<AppState>) -> Json<StatsResponse> {
	Json(StatsResponse { providers: state.service.ai_stats() })
}

async fn auth_middleware(
	State(token): State<Option<Arc<str>>>,
	req: Request,
	next: Next,
) -> Response {
	if let Some(expected) = token.as_deref()
		&& read_bearer_token(req.headers()) != Some(expected)
	{
		return json_error(
			StatusCode::UNAUTHORIZED,
			"UNAUTHORIZED",
			"A valid Bearer token is required.",
			None,
		)
		.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(header::AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
	let origins: Vec<HeaderValue> = origins
		.iter()
		.filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(%origin, "Ignoring CORS origin that is not a header value.");

				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(AllowOrigin::list(origins))
		.allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
		.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::IF_NONE_MATCH])
		.expose_headers([header::CONTENT_DISPOSITION, header::ETAG])
}

struct FileField {
	file_name: String,
	content_type: String,
	bytes: Vec<u8>,
}

/// Reads the multipart part named `file`; other parts are skipped.
async fn read_file_field(mut multipart: Multipart) -> Result<FileField, ApiError> {
	loop {
		let field = multipart.next_field().await.map_err(multipart_error)?;
		let Some(field) = field else {
			return Err(ApiError::invalid_field(
				"$.file",
				"A multipart part named file is required.",
			));
		};

		if field.name() != Some("file") {
			continue;
		}

		let file_name = field.file_name().unwrap_or("upload").to_string();
		let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
		let bytes = field.bytes().await.map_err(multipart_error)?;

		return Ok(FileField { file_name, content_type, bytes: bytes.to_vec() });
	}
}

fn multipart_error(err: MultipartError) -> ApiError {
	json_error(err.status(), "INVALID_REQUEST", err.body_text(), Some(vec!["$.file".to_string()]))
}

fn json_or_default<T>(body: &[u8]) -> Result<T, ApiError>
where
	T: Default + DeserializeOwned,
{
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(T::default());
	}

	serde_json::from_slice(body).map_err(|err| {
		json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", err.to_string(), None)
	})
}

/// Recovers the JSON path from a body deserialization message, e.g. `$.action_items[0].status`.
fn json_error_path(body_text: &str) -> Option<String> {
	let detail = body_text.strip_prefix(JSON_DATA_PREFIX)?;
	let (path, _) = detail.split_once(": ")?;
	let is_path = !path.is_empty()
		&& path.chars().all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '.' | '[' | ']'));

	is_path.then(|| format!("$.{path}"))
}

/// `Json` whose rejections use the API error body.
pub struct ApiJson<T>(pub T);
impl<S, T> FromRequest<S> for ApiJson<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		match Json::<T>::from_request(req, state).await {
			Ok(Json(value)) => Ok(Self(value)),
			Err(rejection) => Err(rejection.into()),
		}
	}
}

pub struct ApiQuery<T>(pub T);
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
	T: DeserializeOwned,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		match Query::<T>::from_request_parts(parts, state).await {
			Ok(Query(value)) => Ok(Self(value)),
			Err(rejection) => Err(rejection.into()),
		}
	}
}

pub struct ApiPath<T>(pub T);
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
	T: DeserializeOwned + Send,
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
		match Path::<T>::from_request_parts(parts, state).await {
			Ok(Path(value)) => Ok(Self(value)),
			Err(rejection) => Err(rejection.into()),
		}
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	fn invalid_field(path: &str, message: impl Into<String>) -> Self {
		Self::new(
			StatusCode::UNPROCESSABLE_ENTITY,
			"INVALID_REQUEST",
			message,
			Some(vec![path.to_string()]),
		)
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message, fields } => json_error(
				StatusCode::UNPROCESSABLE_ENTITY,
				"INVALID_REQUEST",
				message,
				(!fields.is_empty()).then_some(fields),
			),
			Error::NotFound { message } =>
				json_error(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::Conflict { message } =>
				json_error(StatusCode::CONFLICT, "CONFLICT", message, None),
			Error::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message, None),
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage failure.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Internal storage error.",
					None,
				)
			},
			Error::Export { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "EXPORT_ERROR", message, None),
		}
	}
}

impl From<JsonRejection> for ApiError {
	fn from(rejection: JsonRejection) -> Self {
		let message = rejection.body_text();

		match rejection {
			JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
				let fields = json_error_path(&message).map(|path| vec![path]);

				json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", message, fields)
			},
			other => json_error(other.status(), "INVALID_REQUEST", message, None),
		}
	}
}

impl From<QueryRejection> for ApiError {
	fn from(rejection: QueryRejection) -> Self {
		json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", rejection.body_text(), None)
	}
}

impl From<PathRejection> for ApiError {
	fn from(rejection: PathRejection) -> Self {
		json_error(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_REQUEST", rejection.body_text(), None)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}
