use actix_web::http::StatusCode;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// `{base}` in a body or header value is replaced with the server's base URL
#[derive(Clone, Debug)]
pub struct Route {
    status: u16,
    content_type: String,
    body: String,
    headers: Vec<(String, String)>,
}

#[allow(dead_code)]
impl Route {
    pub fn new(status: u16, content_type: &str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body: body.into(),
            headers: Vec::new(),
        }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::new(200, "text/html; charset=utf-8", body)
    }

    pub fn xml(body: impl Into<String>) -> Self {
        Self::new(200, "application/xml", body)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(200, "text/plain", body)
    }

    pub fn status(status: u16) -> Self {
        Self::new(status, "text/plain", "")
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        Self::status(status).with_header("Location", location)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

struct SiteState {
    base_url: OnceLock<String>,
    routes: HashMap<String, Route>,
    hits: Mutex<HashMap<(String, String), usize>>,
}

/// Route table for a throwaway test site
#[derive(Default)]
pub struct TestSite {
    routes: HashMap<String, Route>,
}

#[allow(dead_code)]
impl TestSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, route: Route) -> Self {
        self.routes.insert(path.to_string(), route);
        self
    }

    /// Binds to an ephemeral port and serves the routes until the test ends.
    /// Unknown paths answer 404.
    pub async fn start(self) -> TestServer {
        let state = Arc::new(SiteState {
            base_url: OnceLock::new(),
            routes: self.routes,
            hits: Mutex::new(HashMap::new()),
        });

        let data = web::Data::from(state.clone());
        let http_server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .default_service(web::route().to(handle))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("Failed to bind test server");

        let addr = http_server
            .addrs()
            .first()
            .cloned()
            .expect("No address bound");
        let base_url = format!("http://{}", addr);
        state
            .base_url
            .set(base_url.clone())
            .expect("base url set once");

        let app_server = http_server.run();
        tokio::spawn(async move {
            if let Err(e) = app_server.await {
                eprintln!("Test server error: {}", e);
            }
        });

        TestServer { base_url, state }
    }
}

async fn handle(req: HttpRequest, state: web::Data<SiteState>) -> HttpResponse {
    let path = req.path().to_string();
    *state
        .hits
        .lock()
        .unwrap()
        .entry((req.method().to_string(), path.clone()))
        .or_insert(0) += 1;

    let Some(route) = state.routes.get(&path) else {
        return HttpResponse::NotFound().body("Not Found");
    };

    let base = state.base_url.get().cloned().unwrap_or_default();
    let status = StatusCode::from_u16(route.status).expect("valid status code");
    let mut response = HttpResponse::build(status);
    response.content_type(route.content_type.clone());
    for (name, value) in &route.headers {
        response.insert_header((name.clone(), value.replace("{base}", &base)));
    }
    response.body(route.body.replace("{base}", &base))
}

pub struct TestServer {
    pub base_url: String,
    state: Arc<SiteState>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Requests for `path`, any method
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .iter()
            .filter(|((_, p), _)| p == path)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn hits_for(&self, method: &str, path: &str) -> usize {
        self.state
            .hits
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }
}

/// A 500+ word body of short sentences over a 50-word vocabulary
#[allow(dead_code)]
pub fn long_article(topic: &str) -> String {
    const WORDS: [&str; 50] = [
        "oak", "ash", "elm", "pine", "beech", "birch", "maple", "cherry", "walnut", "cedar",
        "chair", "desk", "shelf", "bench", "stool", "bed", "door", "frame", "drawer", "cabinet",
        "plane", "saw", "chisel", "glue", "clamp", "nail", "screw", "sand", "stain", "wax",
        "grain", "knot", "joint", "mortise", "tenon", "dowel", "board", "plank", "beam", "post",
        "craft", "shop", "tool", "wood", "build", "make", "fit", "cut", "shape", "finish",
    ];

    let mut paragraphs = Vec::new();
    for p in 0..7 {
        let mut sentences = Vec::new();
        for s in 0..10 {
            let start = (p * 10 + s) * 8;
            let words: Vec<&str> = (start..start + 8).map(|i| WORDS[i % WORDS.len()]).collect();
            sentences.push(format!("{}.", words.join(" ")));
        }
        paragraphs.push(format!("<p>{} {}</p>", topic, sentences.join(" ")));
    }
    paragraphs.join("")
}
