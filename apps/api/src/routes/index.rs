use axum::response::Html;

/// GET /
/// Upload form: posts `resume` and `jobDesc` to the match endpoint and renders
/// the result.
pub async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Resume Matcher</title>
  <style>
    body { max-width: 48rem; margin: 2rem auto; padding: 0 1.5rem; font-family: sans-serif; }
    label { display: block; font-weight: 600; margin: 1rem 0 .5rem; }
    input, textarea { width: 100%; padding: .5rem; border: 1px solid #ccc; }
    textarea { font-family: monospace; }
    button { margin-top: 1rem; padding: .5rem 1.5rem; }
    #result { margin-top: 2rem; padding: 1rem; border: 1px solid #ccc; display: none; }
  </style>
</head>
<body>
  <h1>Resume Matcher</h1>
  <form id="match-form">
    <label for="resume">Upload Resume (PDF):</label>
    <input id="resume" name="resume" type="file" accept="application/pdf">
    <label for="jobDesc">Job Description:</label>
    <textarea id="jobDesc" name="jobDesc" rows="8" placeholder="Paste the job description here..."></textarea>
    <button type="submit">Match Resume</button>
  </form>
  <div id="result">
    <h2>Match Score: <span id="score"></span>%</h2>
    <h3>Missing Keywords</h3>
    <ul id="keywords"></ul>
    <h3>Explanation</h3>
    <p id="explanation"></p>
  </div>
  <script>
    const form = document.getElementById("match-form");
    const button = form.querySelector("button");
    form.addEventListener("submit", async (e) => {
      e.preventDefault();
      const data = new FormData(form);
      if (!form.resume.files.length || !data.get("jobDesc").trim()) {
        alert("Please upload a resume and enter a job description.");
        return;
      }
      button.disabled = true;
      button.textContent = "Matching...";
      document.getElementById("result").style.display = "none";
      try {
        const resp = await fetch("/api/resumeMatch", { method: "POST", body: data });
        const body = await resp.json();
        if (!resp.ok) {
          alert(body.error ? body.error.message : "Error matching resume.");
          return;
        }
        document.getElementById("score").textContent = body.matchScore;
        const list = document.getElementById("keywords");
        list.replaceChildren(...body.missingKeywords.map((k) => {
          const li = document.createElement("li");
          li.textContent = k;
          return li;
        }));
        if (!body.missingKeywords.length) list.innerHTML = "<li>None! Great match.</li>";
        document.getElementById("explanation").textContent = body.explanation;
        document.getElementById("result").style.display = "block";
      } catch (err) {
        console.log(err);
      } finally {
        button.disabled = false;
        button.textContent = "Match Resume";
      }
    });
  </script>
</body>
</html>
"#;
