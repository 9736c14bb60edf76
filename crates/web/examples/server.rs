use http::{Method, StatusCode};
use reactor_http::client::{AsyncHttpClient, response_fn};
use reactor_http::reactor::IoLoop;
use reactor_web::{AsyncHttpServer, Request, RequestHandler, get_fn};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Answers POST with the captured id and the size of the posted body.
struct Upload;

impl RequestHandler for Upload {
    fn post(&self, request: &mut Request, args: &[String]) {
        let id = args.first().map_or("?", String::as_str);
        info!(id, body = %String::from_utf8_lossy(request.body()), "receiving request body");
        request.reply(StatusCode::OK, format!("B {id} {}\r\n", request.body().len()));
    }
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut io_loop = match IoLoop::new() {
        Ok(io_loop) => io_loop,
        Err(e) => {
            error!(cause = %e, "failed to create io loop");
            return;
        }
    };

    let server = match AsyncHttpServer::bind(&mut io_loop, "127.0.0.1:8080") {
        Ok(server) => server,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let routes = server
        .add_route("^/a/([0-9]+)$", get_fn(|request, args| {
            info!(path = request.path(), ?args, "serving a");
            request.reply(StatusCode::OK, "A\r\n");
        }))
        .and_then(|()| server.add_route("^/b/([[:digit:]]+)$", Upload));
    if let Err(e) = routes {
        error!(cause = %e, "invalid route");
        return;
    }

    let port = server.local_addr().port();
    let client = AsyncHttpClient::new();
    for (method, path, body) in [(Method::GET, "/a/10", "aaa"), (Method::POST, "/b/10", "bbb")] {
        let label = format!("{method} {path}");
        let fetched = client.fetch(&mut io_loop, "127.0.0.1", port, method, path, body, response_fn(move |response| {
            info!(request = %label, status = %response.status(), body = %String::from_utf8_lossy(response.body()), "fetched");
        }));
        if let Err(e) = fetched {
            error!(cause = %e, "fetch failed");
        }
    }

    info!(addr = %server.local_addr(), "serving, try: curl http://127.0.0.1:8080/a/1");
    if let Err(e) = io_loop.run() {
        error!(cause = %e, "io loop failed");
    }
}
