//! Control page served at `/`.
//!
//! Direction buttons call `/control`; a 2 s poll of `/status` shows whether
//! the car is still inside its command window.

pub(crate) const INDEX_HTML: &str = concat!(
    "<!DOCTYPE html><html><head>",
    "<meta charset='UTF-8'>",
    "<meta name='viewport' content='width=device-width, initial-scale=1.0'>",
    "<title>Differential Drive Control</title>",
    "<style>",
    "body{font-family:Arial;text-align:center;background:#1a1a1a;color:#fff;margin:0;padding:20px}",
    "h1{color:#4CAF50}",
    ".controls{max-width:400px;margin:20px auto}",
    ".btn{background:#4CAF50;border:none;color:#fff;padding:20px;font-size:18px;",
    "margin:5px;border-radius:10px;cursor:pointer;min-width:100px}",
    ".btn:active{background:#45a049}",
    ".stop{background:#f44336}",
    "input[type=range]{width:80%}",
    ".status{background:#333;padding:15px;border-radius:10px;margin:20px 0}",
    "</style></head><body>",
    "<h1>Differential Drive Control</h1>",
    "<div class='status'>Status: <span id='status'>connecting...</span></div>",
    "<div><label>Speed: <span id='speedVal'>200</span></label><br>",
    "<input type='range' id='speed' min='100' max='255' value='200' ",
    "oninput=\"document.getElementById('speedVal').textContent=this.value\"></div>",
    "<div class='controls'>",
    "<button class='btn' onclick=\"send('forward')\">Forward</button><br>",
    "<button class='btn' onclick=\"send('left')\">Left</button>",
    "<button class='btn stop' onclick=\"send('stop')\">Stop</button>",
    "<button class='btn' onclick=\"send('right')\">Right</button><br>",
    "<button class='btn' onclick=\"send('backward')\">Backward</button>",
    "</div><script>",
    "const st=document.getElementById('status');",
    "function send(cmd){",
    "const speed=document.getElementById('speed').value;",
    "fetch(`/control?cmd=${cmd}&speed=${speed}`).then(r=>r.text())",
    ".then(d=>{st.textContent=d}).catch(()=>{st.textContent='error'});}",
    "setInterval(()=>{fetch('/status').then(r=>r.text())",
    ".then(d=>{st.textContent=d==='timeout'?'idle (timed out)':'connected'})",
    ".catch(()=>{st.textContent='disconnected'});},2000);",
    "</script></body></html>"
);
