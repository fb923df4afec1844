//! Text templates for every injectable capability.
//!
//! Kotlin blocks are written at column zero and shifted to the class body
//! indent with [`indent_block`]. Placeholders look like `__NAME__` and are
//! substituted by [`render`]; the Kotlin itself is kept brace-literal so it
//! reads the way it will land in the activity.
//!
//! Generated Kotlin only uses fully-qualified platform names, so the target
//! file's import list is never touched. Every member a block declares is
//! prefixed with its capability (`folderPicker*`, `micPermission*`,
//! `speech*`) and blocks never reference each other.

use crate::bridge::{
    AMPLITUDE_MIN_INTERVAL, FOLDER_PICKER_TIMEOUT, MIC_PERMISSION_TIMEOUT, SPEECH_DRAIN_MAX,
    SPEECH_QUEUE_CAPACITY, SPEECH_START_TIMEOUT,
};
use crate::patcher::markers::{
    request_codes, Capability, Marker, FOLDER_PICKER_CORE, FOLDER_PICKER_HOOK, FOLDER_PICKER_KEEP,
    MANIFEST_BLOCK_COMMENT, MIC_PERMISSION_CORE, MIC_PERMISSION_HOOK, MIC_PERMISSION_KEEP,
    RELEASE_SIGNING, SETTINGS_FALLBACK, SPEECH_CORE, SPEECH_HOOK, SPEECH_KEEP,
};

/// Annotation protecting entry points from release shrinking
pub const KEEP_ANNOTATION: &str = "@androidx.annotation.Keep";

/// Externally invoked activity methods, per capability. Renaming any of
/// these breaks the embedding runtime.
pub const ENTRY_POINTS: &[(Capability, &str)] = &[
    (Capability::FolderPicker, "pickFolderBlocking"),
    (Capability::MicPermission, "requestMicrophonePermissionBlocking"),
    (Capability::SpeechRecognition, "startSpeechRecognitionBlocking"),
    (Capability::SpeechRecognition, "stopSpeechRecognition"),
    (Capability::SpeechRecognition, "cancelSpeechRecognition"),
    (Capability::SpeechRecognition, "drainSpeechEvents"),
];

/// Signing script file name, relative to the app module
pub const SIGNING_SCRIPT_NAME: &str = "droidpatch-signing.gradle";

/// Folder picker core: monitor, blocking entry point, result dispatcher.
pub const FOLDER_PICKER_CORE_TEMPLATE: &str = r#"// __MARKER__
private enum class FolderPickerState { IDLE, WAITING, DONE }

private class FolderPickerMonitor {
    val lock = java.util.concurrent.locks.ReentrantLock()
    val done: java.util.concurrent.locks.Condition = lock.newCondition()
    var state = FolderPickerState.IDLE
    var sequence = 0
    var requestCode = 0
    var result: String? = null
    var error: String? = null
}

private val folderPickerMonitor = FolderPickerMonitor()
private val folderPickerRequestBase = __REQUEST_BASE__
private val folderPickerRequestSpan = __REQUEST_SPAN__
private val folderPickerDefaultTimeoutMs = __TIMEOUT_MS__L

@androidx.annotation.Keep
fun pickFolderBlocking(timeoutMs: Long): String? {
    val code = folderPickerBegin()
    runOnUiThread {
        try {
            val intent = android.content.Intent(android.content.Intent.ACTION_OPEN_DOCUMENT_TREE)
            intent.addFlags(
                android.content.Intent.FLAG_GRANT_READ_URI_PERMISSION or
                    android.content.Intent.FLAG_GRANT_WRITE_URI_PERMISSION or
                    android.content.Intent.FLAG_GRANT_PERSISTABLE_URI_PERMISSION
            )
            @Suppress("DEPRECATION")
            startActivityForResult(intent, code)
        } catch (e: Exception) {
            folderPickerComplete(code, null, e.message ?: "failed to open folder picker")
        }
    }

    val timeout = if (timeoutMs > 0) timeoutMs else folderPickerDefaultTimeoutMs
    val m = folderPickerMonitor
    m.lock.lock()
    try {
        var remaining = java.util.concurrent.TimeUnit.MILLISECONDS.toNanos(timeout)
        while (m.state == FolderPickerState.WAITING && m.requestCode == code) {
            if (remaining <= 0L) {
                m.state = FolderPickerState.IDLE
                throw java.util.concurrent.TimeoutException("folder picker timed out after $timeout ms")
            }
            remaining = m.done.awaitNanos(remaining)
        }
        if (m.state != FolderPickerState.DONE || m.requestCode != code) {
            throw IllegalStateException("folder picker request $code superseded")
        }
        m.state = FolderPickerState.IDLE
        val error = m.error
        if (error != null) {
            throw IllegalStateException(error)
        }
        return m.result
    } finally {
        m.lock.unlock()
    }
}

private fun folderPickerBegin(): Int {
    val m = folderPickerMonitor
    m.lock.lock()
    try {
        if (m.state == FolderPickerState.WAITING) {
            throw IllegalStateException("busy")
        }
        val code = folderPickerRequestBase + (m.sequence % folderPickerRequestSpan)
        m.sequence = if (m.sequence == Int.MAX_VALUE) 0 else m.sequence + 1
        m.requestCode = code
        m.result = null
        m.error = null
        m.state = FolderPickerState.WAITING
        return code
    } finally {
        m.lock.unlock()
    }
}

private fun folderPickerComplete(code: Int, result: String?, error: String?): Boolean {
    val m = folderPickerMonitor
    m.lock.lock()
    try {
        if (m.state != FolderPickerState.WAITING || m.requestCode != code) {
            return false
        }
        m.result = result
        m.error = error
        m.state = FolderPickerState.DONE
        m.done.signalAll()
        return true
    } finally {
        m.lock.unlock()
    }
}

private fun handleFolderPickerResult(requestCode: Int, resultCode: Int, data: android.content.Intent?): Boolean {
    if (requestCode < folderPickerRequestBase || requestCode >= folderPickerRequestBase + folderPickerRequestSpan) {
        return false
    }
    val uri = if (resultCode == android.app.Activity.RESULT_OK) data?.data else null
    if (uri != null) {
        try {
            contentResolver.takePersistableUriPermission(
                uri,
                android.content.Intent.FLAG_GRANT_READ_URI_PERMISSION or
                    android.content.Intent.FLAG_GRANT_WRITE_URI_PERMISSION
            )
        } catch (e: SecurityException) {
            android.util.Log.w("droidpatch", "persistable tree permission refused", e)
        }
    }
    folderPickerComplete(requestCode, uri?.toString(), null)
    return true
}
"#;

/// Microphone permission core.
pub const MIC_PERMISSION_CORE_TEMPLATE: &str = r#"// __MARKER__
private enum class MicPermissionState { IDLE, WAITING, DONE }

private class MicPermissionMonitor {
    val lock = java.util.concurrent.locks.ReentrantLock()
    val done: java.util.concurrent.locks.Condition = lock.newCondition()
    var state = MicPermissionState.IDLE
    var sequence = 0
    var requestCode = 0
    var granted = false
    var error: String? = null
}

private val micPermissionMonitor = MicPermissionMonitor()
private val micPermissionRequestBase = __REQUEST_BASE__
private val micPermissionRequestSpan = __REQUEST_SPAN__
private val micPermissionDefaultTimeoutMs = __TIMEOUT_MS__L

@androidx.annotation.Keep
fun requestMicrophonePermissionBlocking(timeoutMs: Long): Boolean {
    if (checkSelfPermission(android.Manifest.permission.RECORD_AUDIO) ==
        android.content.pm.PackageManager.PERMISSION_GRANTED
    ) {
        return true
    }
    val code = micPermissionBegin()
    runOnUiThread {
        try {
            requestPermissions(arrayOf(android.Manifest.permission.RECORD_AUDIO), code)
        } catch (e: Exception) {
            micPermissionComplete(code, false, e.message ?: "failed to request microphone permission")
        }
    }

    val timeout = if (timeoutMs > 0) timeoutMs else micPermissionDefaultTimeoutMs
    val m = micPermissionMonitor
    m.lock.lock()
    try {
        var remaining = java.util.concurrent.TimeUnit.MILLISECONDS.toNanos(timeout)
        while (m.state == MicPermissionState.WAITING && m.requestCode == code) {
            if (remaining <= 0L) {
                m.state = MicPermissionState.IDLE
                throw java.util.concurrent.TimeoutException("microphone permission timed out after $timeout ms")
            }
            remaining = m.done.awaitNanos(remaining)
        }
        if (m.state != MicPermissionState.DONE || m.requestCode != code) {
            throw IllegalStateException("microphone permission request $code superseded")
        }
        m.state = MicPermissionState.IDLE
        val error = m.error
        if (error != null) {
            throw IllegalStateException(error)
        }
        return m.granted
    } finally {
        m.lock.unlock()
    }
}

private fun micPermissionBegin(): Int {
    val m = micPermissionMonitor
    m.lock.lock()
    try {
        if (m.state == MicPermissionState.WAITING) {
            throw IllegalStateException("busy")
        }
        val code = micPermissionRequestBase + (m.sequence % micPermissionRequestSpan)
        m.sequence = if (m.sequence == Int.MAX_VALUE) 0 else m.sequence + 1
        m.requestCode = code
        m.granted = false
        m.error = null
        m.state = MicPermissionState.WAITING
        return code
    } finally {
        m.lock.unlock()
    }
}

private fun micPermissionComplete(code: Int, granted: Boolean, error: String?): Boolean {
    val m = micPermissionMonitor
    m.lock.lock()
    try {
        if (m.state != MicPermissionState.WAITING || m.requestCode != code) {
            return false
        }
        m.granted = granted
        m.error = error
        m.state = MicPermissionState.DONE
        m.done.signalAll()
        return true
    } finally {
        m.lock.unlock()
    }
}

private fun handleMicPermissionResult(requestCode: Int, grantResults: IntArray): Boolean {
    if (requestCode < micPermissionRequestBase || requestCode >= micPermissionRequestBase + micPermissionRequestSpan) {
        return false
    }
    val granted = grantResults.isNotEmpty() &&
        grantResults[0] == android.content.pm.PackageManager.PERMISSION_GRANTED
    micPermissionComplete(requestCode, granted, null)
    return true
}
"#;

/// Speech recognition core: start rendezvous, session ownership, bounded
/// event queue and drain accessor.
pub const SPEECH_CORE_TEMPLATE: &str = r#"// __MARKER__
private enum class SpeechStartState { IDLE, WAITING, DONE }

private class SpeechStartMonitor {
    val lock = java.util.concurrent.locks.ReentrantLock()
    val done: java.util.concurrent.locks.Condition = lock.newCondition()
    var state = SpeechStartState.IDLE
    var sequence = 0
    var requestCode = 0
    var error: String? = null
}

private val speechStartMonitor = SpeechStartMonitor()
private val speechRequestBase = __REQUEST_BASE__
private val speechRequestSpan = __REQUEST_SPAN__
private val speechDefaultStartTimeoutMs = __TIMEOUT_MS__L
private val speechQueueCapacity = __QUEUE_CAPACITY__
private val speechDrainMax = __DRAIN_MAX__
private val speechAmplitudeIntervalMs = __AMPLITUDE_INTERVAL_MS__L
private val speechQueueLock = Any()
private val speechQueue = java.util.ArrayDeque<org.json.JSONObject>()
private val speechSessionLock = Any()
private var speechActiveSession = 0
private var speechNextSession = 0
private var speechLastAmplitudeAt = 0L
private var speechRecognizer: android.speech.SpeechRecognizer? = null

@androidx.annotation.Keep
fun startSpeechRecognitionBlocking(language: String, timeoutMs: Long): Int {
    val session = speechBeginSession()
    val code = try {
        speechStartBegin()
    } catch (e: Exception) {
        speechEndSession(session)
        throw e
    }
    runOnUiThread {
        try {
            if (!android.speech.SpeechRecognizer.isRecognitionAvailable(this)) {
                speechStartComplete(code, "speech recognition unavailable")
                return@runOnUiThread
            }
            speechRecognizer?.destroy()
            val recognizer = android.speech.SpeechRecognizer.createSpeechRecognizer(this)
            speechRecognizer = recognizer
            recognizer.setRecognitionListener(speechListener(session, code))
            val intent = android.content.Intent(android.speech.RecognizerIntent.ACTION_RECOGNIZE_SPEECH)
            intent.putExtra(
                android.speech.RecognizerIntent.EXTRA_LANGUAGE_MODEL,
                android.speech.RecognizerIntent.LANGUAGE_MODEL_FREE_FORM
            )
            intent.putExtra(android.speech.RecognizerIntent.EXTRA_PARTIAL_RESULTS, true)
            if (language.isNotBlank()) {
                intent.putExtra(android.speech.RecognizerIntent.EXTRA_LANGUAGE, language)
            }
            recognizer.startListening(intent)
        } catch (e: Exception) {
            speechStartComplete(code, e.message ?: "failed to start speech recognition")
        }
    }

    val timeout = if (timeoutMs > 0) timeoutMs else speechDefaultStartTimeoutMs
    try {
        speechStartAwait(code, timeout)
    } catch (e: Exception) {
        speechEndSession(session)
        runOnUiThread { speechRecognizer?.cancel() }
        throw e
    }
    return session
}

@androidx.annotation.Keep
fun stopSpeechRecognition(sessionId: Int): Boolean {
    synchronized(speechSessionLock) {
        if (speechActiveSession != sessionId) {
            return false
        }
    }
    runOnUiThread { speechRecognizer?.stopListening() }
    return true
}

@androidx.annotation.Keep
fun cancelSpeechRecognition(sessionId: Int): Boolean {
    synchronized(speechSessionLock) {
        if (speechActiveSession != sessionId) {
            return false
        }
        speechEnqueue(speechStateEvent(sessionId, "cancelled"))
        speechActiveSession = 0
    }
    speechStartCancel()
    runOnUiThread { speechRecognizer?.cancel() }
    return true
}

@androidx.annotation.Keep
fun drainSpeechEvents(maxEvents: Int): String {
    val limit = if (maxEvents <= 0) speechDrainMax else minOf(maxEvents, speechDrainMax)
    val drained = org.json.JSONArray()
    synchronized(speechQueueLock) {
        var taken = 0
        while (taken < limit) {
            val next = speechQueue.pollFirst() ?: break
            drained.put(next)
            taken += 1
        }
    }
    return drained.toString()
}

private fun speechBeginSession(): Int {
    synchronized(speechSessionLock) {
        if (speechActiveSession != 0) {
            throw IllegalStateException("busy")
        }
        speechNextSession = if (speechNextSession == Int.MAX_VALUE) 1 else speechNextSession + 1
        speechActiveSession = speechNextSession
        speechLastAmplitudeAt = 0L
        synchronized(speechQueueLock) {
            speechQueue.clear()
        }
        return speechActiveSession
    }
}

private fun speechEndSession(session: Int) {
    synchronized(speechSessionLock) {
        if (speechActiveSession == session) {
            speechActiveSession = 0
        }
    }
}

private fun speechStartBegin(): Int {
    val m = speechStartMonitor
    m.lock.lock()
    try {
        if (m.state == SpeechStartState.WAITING) {
            throw IllegalStateException("busy")
        }
        val code = speechRequestBase + (m.sequence % speechRequestSpan)
        m.sequence = if (m.sequence == Int.MAX_VALUE) 0 else m.sequence + 1
        m.requestCode = code
        m.error = null
        m.state = SpeechStartState.WAITING
        return code
    } finally {
        m.lock.unlock()
    }
}

private fun speechStartComplete(code: Int, error: String?): Boolean {
    val m = speechStartMonitor
    m.lock.lock()
    try {
        if (m.state != SpeechStartState.WAITING || m.requestCode != code) {
            return false
        }
        m.error = error
        m.state = SpeechStartState.DONE
        m.done.signalAll()
        return true
    } finally {
        m.lock.unlock()
    }
}

private fun speechStartCancel() {
    val m = speechStartMonitor
    m.lock.lock()
    try {
        if (m.state == SpeechStartState.WAITING) {
            m.error = "cancelled"
            m.state = SpeechStartState.DONE
            m.done.signalAll()
        }
    } finally {
        m.lock.unlock()
    }
}

private fun speechStartAwait(code: Int, timeout: Long) {
    val m = speechStartMonitor
    m.lock.lock()
    try {
        var remaining = java.util.concurrent.TimeUnit.MILLISECONDS.toNanos(timeout)
        while (m.state == SpeechStartState.WAITING && m.requestCode == code) {
            if (remaining <= 0L) {
                m.state = SpeechStartState.IDLE
                throw java.util.concurrent.TimeoutException("speech recognizer not ready after $timeout ms")
            }
            remaining = m.done.awaitNanos(remaining)
        }
        if (m.state != SpeechStartState.DONE || m.requestCode != code) {
            throw IllegalStateException("speech start request $code superseded")
        }
        m.state = SpeechStartState.IDLE
        val error = m.error
        if (error != null) {
            throw IllegalStateException(error)
        }
    } finally {
        m.lock.unlock()
    }
}

private fun speechEnqueue(event: org.json.JSONObject) {
    synchronized(speechQueueLock) {
        while (speechQueue.size >= speechQueueCapacity) {
            speechQueue.pollFirst()
        }
        speechQueue.addLast(event)
    }
}

private fun speechEvent(type: String, session: Int): org.json.JSONObject {
    val event = org.json.JSONObject()
    event.put("type", type)
    event.put("session", session)
    return event
}

private fun speechStateEvent(session: Int, state: String): org.json.JSONObject {
    val event = speechEvent("state", session)
    event.put("state", state)
    return event
}

private fun speechEmit(session: Int, event: org.json.JSONObject, endsSession: Boolean) {
    synchronized(speechSessionLock) {
        if (speechActiveSession != session) {
            return
        }
        speechEnqueue(event)
        if (endsSession) {
            speechActiveSession = 0
        }
    }
}

private fun speechEmitAmplitude(session: Int, rms: Float) {
    val now = android.os.SystemClock.elapsedRealtime()
    synchronized(speechSessionLock) {
        if (speechActiveSession != session) {
            return
        }
        if (speechLastAmplitudeAt != 0L && now - speechLastAmplitudeAt < speechAmplitudeIntervalMs) {
            return
        }
        speechLastAmplitudeAt = now
        val event = speechEvent("amplitude", session)
        event.put("rms", rms.toDouble())
        speechEnqueue(event)
    }
}

private fun speechListener(session: Int, code: Int): android.speech.RecognitionListener {
    return object : android.speech.RecognitionListener {
        override fun onReadyForSpeech(params: android.os.Bundle?) {
            speechEmit(session, speechStateEvent(session, "listening"), false)
            speechStartComplete(code, null)
        }

        override fun onBeginningOfSpeech() {
            speechEmit(session, speechStateEvent(session, "speaking"), false)
        }

        override fun onRmsChanged(rmsdB: Float) {
            speechEmitAmplitude(session, rmsdB)
        }

        override fun onBufferReceived(buffer: ByteArray?) {}

        override fun onEndOfSpeech() {
            speechEmit(session, speechStateEvent(session, "processing"), false)
        }

        override fun onError(error: Int) {
            speechStartComplete(code, "recognizer error $error")
            val event = speechEvent("error", session)
            event.put("code", error)
            event.put("message", "recognizer error $error")
            speechEmit(session, event, true)
        }

        override fun onResults(results: android.os.Bundle?) {
            val text = results
                ?.getStringArrayList(android.speech.SpeechRecognizer.RESULTS_RECOGNITION)
                ?.firstOrNull() ?: ""
            val event = speechEvent("final", session)
            event.put("text", text)
            speechEmit(session, event, true)
        }

        override fun onPartialResults(partialResults: android.os.Bundle?) {
            val text = partialResults
                ?.getStringArrayList(android.speech.SpeechRecognizer.RESULTS_RECOGNITION)
                ?.firstOrNull() ?: return
            val event = speechEvent("partial", session)
            event.put("text", text)
            speechEmit(session, event, false)
        }

        override fun onEvent(eventType: Int, params: android.os.Bundle?) {}
    }
}

private fun releaseSpeechRecognizer() {
    synchronized(speechSessionLock) {
        speechActiveSession = 0
    }
    speechStartCancel()
    speechRecognizer?.destroy()
    speechRecognizer = null
}
"#;

pub const FOLDER_PICKER_OVERRIDE_TEMPLATE: &str = r#"// __MARKER__
@Suppress("DEPRECATION", "OVERRIDE_DEPRECATION")
override fun onActivityResult(requestCode: Int, resultCode: Int, data: android.content.Intent?) {
    if (handleFolderPickerResult(requestCode, resultCode, data)) return
    super.onActivityResult(requestCode, resultCode, data)
}
"#;

pub const MIC_PERMISSION_OVERRIDE_TEMPLATE: &str = r#"// __MARKER__
override fun onRequestPermissionsResult(
    requestCode: Int,
    permissions: Array<out String>,
    grantResults: IntArray
) {
    if (handleMicPermissionResult(requestCode, grantResults)) return
    super.onRequestPermissionsResult(requestCode, permissions, grantResults)
}
"#;

pub const SPEECH_OVERRIDE_TEMPLATE: &str = r#"// __MARKER__
override fun onDestroy() {
    releaseSpeechRecognizer()
    super.onDestroy()
}
"#;

/// Runtime-gated release signing. Produces no signing configuration unless
/// all four variables are non-blank and the keystore file exists.
pub const SIGNING_SCRIPT_TEMPLATE: &str = r#"// __MARKER__
// Generated by droidpatch; regenerated whenever it is missing.
def droidpatchKeystorePath = System.getenv("__ENV_KEYSTORE_PATH__")
def droidpatchKeystorePassword = System.getenv("__ENV_KEYSTORE_PASSWORD__")
def droidpatchKeyAlias = System.getenv("__ENV_KEY_ALIAS__")
def droidpatchKeyPassword = System.getenv("__ENV_KEY_PASSWORD__")

def droidpatchSigningReady = [
    droidpatchKeystorePath,
    droidpatchKeystorePassword,
    droidpatchKeyAlias,
    droidpatchKeyPassword,
].every { it != null && !it.trim().isEmpty() } && file(droidpatchKeystorePath).exists()

if (droidpatchSigningReady) {
    android {
        signingConfigs {
            droidpatchRelease {
                storeFile file(droidpatchKeystorePath)
                storePassword droidpatchKeystorePassword
                keyAlias droidpatchKeyAlias
                keyPassword droidpatchKeyPassword
            }
        }
        buildTypes {
            release {
                signingConfig signingConfigs.droidpatchRelease
            }
        }
    }
    logger.lifecycle("droidpatch: release signing configured")
} else {
    logger.lifecycle("droidpatch: release signing skipped, keystore environment incomplete")
}
"#;

pub const SETTINGS_FALLBACK_GROOVY: &str = r#"// __MARKER__
dependencyResolutionManagement {
    repositories {
        google()
        mavenCentral()
    }
}

include ':app'
"#;

pub const SETTINGS_FALLBACK_KTS: &str = r#"// __MARKER__
dependencyResolutionManagement {
    repositories {
        google()
        mavenCentral()
    }
}

include(":app")
"#;

/// Substitute every `(placeholder, value)` pair
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter()
        .fold(template.to_string(), |acc, (key, value)| acc.replace(key, value))
}

/// Prefix every non-blank line with `indent`; the result ends with a newline
pub fn indent_block(text: &str, indent: &str) -> String {
    let mut out = String::with_capacity(text.len() + indent.len() * 16);
    for line in text.lines() {
        if !line.trim().is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

fn bridge_vars(marker: &Marker, timeout_ms: u128) -> Vec<(&'static str, String)> {
    let codes = request_codes(marker.capability);
    vec![
        ("__MARKER__", marker.text.to_string()),
        ("__REQUEST_BASE__", codes.map(|c| c.base).unwrap_or_default().to_string()),
        ("__REQUEST_SPAN__", codes.map(|c| c.span).unwrap_or(1).to_string()),
        ("__TIMEOUT_MS__", timeout_ms.to_string()),
    ]
}

/// Core block for a bridged capability, unindented
pub fn core_block(capability: Capability) -> Option<String> {
    let text = match capability {
        Capability::FolderPicker => render(
            FOLDER_PICKER_CORE_TEMPLATE,
            &bridge_vars(&FOLDER_PICKER_CORE, FOLDER_PICKER_TIMEOUT.as_millis()),
        ),
        Capability::MicPermission => render(
            MIC_PERMISSION_CORE_TEMPLATE,
            &bridge_vars(&MIC_PERMISSION_CORE, MIC_PERMISSION_TIMEOUT.as_millis()),
        ),
        Capability::SpeechRecognition => {
            let mut vars = bridge_vars(&SPEECH_CORE, SPEECH_START_TIMEOUT.as_millis());
            vars.push(("__QUEUE_CAPACITY__", SPEECH_QUEUE_CAPACITY.to_string()));
            vars.push(("__DRAIN_MAX__", SPEECH_DRAIN_MAX.to_string()));
            vars.push((
                "__AMPLITUDE_INTERVAL_MS__",
                AMPLITUDE_MIN_INTERVAL.as_millis().to_string(),
            ));
            render(SPEECH_CORE_TEMPLATE, &vars)
        }
        _ => return None,
    };
    Some(text)
}

/// Lifecycle callback a bridge hooks into
pub fn hook_method(capability: Capability) -> Option<&'static str> {
    match capability {
        Capability::FolderPicker => Some("onActivityResult"),
        Capability::MicPermission => Some("onRequestPermissionsResult"),
        Capability::SpeechRecognition => Some("onDestroy"),
        _ => None,
    }
}

/// Dispatch statement for an existing callback, using its own parameter names.
///
/// `None` when the method does not declare the parameters the statement
/// needs.
pub fn hook_statement(capability: Capability, params: &[String]) -> Option<String> {
    match capability {
        Capability::FolderPicker if params.len() >= 3 => Some(format!(
            "if (handleFolderPickerResult({}, {}, {})) return",
            params[0], params[1], params[2]
        )),
        Capability::MicPermission if params.len() >= 3 => Some(format!(
            "if (handleMicPermissionResult({}, {})) return",
            params[0], params[2]
        )),
        Capability::SpeechRecognition => Some("releaseSpeechRecognizer()".to_string()),
        _ => None,
    }
}

/// Marker comment plus dispatch statement, both at `indent`
pub fn hook_snippet(capability: Capability, params: &[String], indent: &str) -> Option<String> {
    let marker = hook_marker(capability)?;
    let statement = hook_statement(capability, params)?;
    Some(format!("{indent}// {}\n{indent}{}\n", marker.text, statement, indent = indent))
}

pub fn hook_marker(capability: Capability) -> Option<&'static Marker> {
    match capability {
        Capability::FolderPicker => Some(&FOLDER_PICKER_HOOK),
        Capability::MicPermission => Some(&MIC_PERMISSION_HOOK),
        Capability::SpeechRecognition => Some(&SPEECH_HOOK),
        _ => None,
    }
}

/// Complete override of the hooked callback, unindented
pub fn fresh_override(capability: Capability) -> Option<String> {
    let (template, marker) = match capability {
        Capability::FolderPicker => (FOLDER_PICKER_OVERRIDE_TEMPLATE, &FOLDER_PICKER_HOOK),
        Capability::MicPermission => (MIC_PERMISSION_OVERRIDE_TEMPLATE, &MIC_PERMISSION_HOOK),
        Capability::SpeechRecognition => (SPEECH_OVERRIDE_TEMPLATE, &SPEECH_HOOK),
        _ => return None,
    };
    Some(render(template, &[("__MARKER__", marker.text.to_string())]))
}

/// Keep rule for one capability's entry points
pub fn keep_rule(capability: Capability) -> Option<String> {
    let (marker, members): (&Marker, &[&str]) = match capability {
        Capability::FolderPicker => (
            &FOLDER_PICKER_KEEP,
            &["public java.lang.String pickFolderBlocking(long);"],
        ),
        Capability::MicPermission => (
            &MIC_PERMISSION_KEEP,
            &["public boolean requestMicrophonePermissionBlocking(long);"],
        ),
        Capability::SpeechRecognition => (
            &SPEECH_KEEP,
            &[
                "public int startSpeechRecognitionBlocking(java.lang.String, long);",
                "public boolean stopSpeechRecognition(int);",
                "public boolean cancelSpeechRecognition(int);",
                "public java.lang.String drainSpeechEvents(int);",
            ],
        ),
        _ => return None,
    };

    let mut rule = format!("# {}\n-keepclassmembers class * extends android.app.Activity {{\n", marker.text);
    for member in members {
        rule.push_str("    ");
        rule.push_str(member);
        rule.push('\n');
    }
    rule.push_str("}\n");
    Some(rule)
}

/// Names of the four signing variables: keystore path, keystore password,
/// key alias, key password
pub fn signing_script(env: &[String; 4]) -> String {
    render(
        SIGNING_SCRIPT_TEMPLATE,
        &[
            ("__MARKER__", RELEASE_SIGNING.text.to_string()),
            ("__ENV_KEYSTORE_PATH__", env[0].clone()),
            ("__ENV_KEYSTORE_PASSWORD__", env[1].clone()),
            ("__ENV_KEY_ALIAS__", env[2].clone()),
            ("__ENV_KEY_PASSWORD__", env[3].clone()),
        ],
    )
}

/// Inclusion line for the signing script in the app build script
pub fn signing_apply_line(script_name: &str, kotlin_dsl: bool) -> String {
    if kotlin_dsl {
        format!("apply(from = \"{}\")", script_name)
    } else {
        format!("apply from: '{}'", script_name)
    }
}

pub fn settings_fallback(kotlin_dsl: bool) -> String {
    let template = if kotlin_dsl {
        SETTINGS_FALLBACK_KTS
    } else {
        SETTINGS_FALLBACK_GROOVY
    };
    render(template, &[("__MARKER__", SETTINGS_FALLBACK.text.to_string())])
}

pub fn manifest_comment(indent: &str) -> String {
    format!("{}<!-- {} -->\n", indent, MANIFEST_BLOCK_COMMENT)
}

pub fn manifest_permission(permission: &str, indent: &str) -> String {
    format!("{}<uses-permission android:name=\"{}\" />\n", indent, permission)
}

/// Package visibility declaration for an intent action
pub fn manifest_queries(action: &str, indent: &str) -> String {
    format!(
        "{i}<queries>\n{i}    <intent>\n{i}        <action android:name=\"{a}\" />\n{i}    </intent>\n{i}</queries>\n",
        i = indent,
        a = action
    )
}
