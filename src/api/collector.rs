//! The browser collector served at `GET /fraud/collector.js`.

/// Render the collector script. The Turnstile loader URL comes from
/// configuration; everything else is constant.
pub fn build_collector_script(turnstile_js_url: &str) -> String {
    COLLECTOR_JS_TEMPLATE.replace("__TURNSTILE_JS_URL__", turnstile_js_url)
}

/// Placeholders:
/// - `__TURNSTILE_JS_URL__`: the Turnstile api.js loader URL
const COLLECTOR_JS_TEMPLATE: &str = r#"(function (global) {
  var behavior = {
    startedAt: Date.now(),
    maxScrollY: 0,
    scrollCount: 0,
    keydownCount: 0,
    mouseMoveCount: 0,
    touchCount: 0
  };

  function onScroll() {
    behavior.scrollCount += 1;
    var y = global.scrollY || global.pageYOffset || 0;
    if (y > behavior.maxScrollY) behavior.maxScrollY = Math.floor(y);
  }

  try {
    document.addEventListener('scroll', onScroll, { passive: true });
    document.addEventListener('keydown', function () { behavior.keydownCount += 1; }, { passive: true });
    document.addEventListener('mousemove', function () { behavior.mouseMoveCount += 1; }, { passive: true });
    document.addEventListener('touchstart', function () { behavior.touchCount += 1; }, { passive: true });
  } catch (_) {}

  async function maybeGetGeo(options) {
    if (!options || !options.includeGeolocation || !navigator.geolocation) {
      return null;
    }

    var timeoutMs = options.geoTimeoutMs || 1200;
    return await new Promise(function (resolve) {
      navigator.geolocation.getCurrentPosition(
        function (pos) {
          resolve({
            latitude: pos.coords.latitude,
            longitude: pos.coords.longitude,
            accuracy_meters: pos.coords.accuracy
          });
        },
        function () { resolve(null); },
        { maximumAge: 0, timeout: timeoutMs, enableHighAccuracy: false }
      );
    });
  }

  function getWebGLInfo() {
    try {
      var canvas = document.createElement('canvas');
      var gl = canvas.getContext('webgl') || canvas.getContext('experimental-webgl');
      if (!gl) return null;
      var dbg = gl.getExtension('WEBGL_debug_renderer_info');
      return {
        vendor: dbg ? gl.getParameter(dbg.UNMASKED_VENDOR_WEBGL) : null,
        renderer: dbg ? gl.getParameter(dbg.UNMASKED_RENDERER_WEBGL) : null
      };
    } catch (_) {
      return null;
    }
  }

  function getClientHints() {
    var uaData = navigator.userAgentData;
    if (!uaData) return null;
    return {
      mobile: !!uaData.mobile,
      platform: uaData.platform || null,
      brands: Array.isArray(uaData.brands)
        ? uaData.brands.map(function (b) { return b.brand; }).filter(Boolean)
        : []
    };
  }

  function getBehavior() {
    var doc = document.documentElement;
    return {
      time_on_page_ms: Math.max(0, Date.now() - behavior.startedAt),
      max_scroll_y: behavior.maxScrollY,
      scroll_count: behavior.scrollCount,
      document_height: doc ? Math.floor(doc.scrollHeight || 0) : 0,
      keydown_count: behavior.keydownCount,
      mouse_move_count: behavior.mouseMoveCount,
      touch_count: behavior.touchCount
    };
  }

  async function collectSignals(options) {
    var geo = await maybeGetGeo(options || {});
    var tz = Intl.DateTimeFormat().resolvedOptions().timeZone || null;
    var utcOffsetMinutes = -new Date().getTimezoneOffset();

    return {
      event_id: (options && options.eventId) || null,
      session_id: (options && options.sessionId) || null,
      client_reported_ip: (options && options.clientReportedIp) || null,
      navigator: {
        user_agent: navigator.userAgent,
        language: navigator.language || null,
        languages: Array.isArray(navigator.languages) ? navigator.languages : [],
        platform: navigator.platform || null,
        webdriver: typeof navigator.webdriver === 'boolean' ? navigator.webdriver : null,
        hardware_concurrency: navigator.hardwareConcurrency || null,
        device_memory: navigator.deviceMemory || null,
        max_touch_points: navigator.maxTouchPoints || 0,
        cookie_enabled: typeof navigator.cookieEnabled === 'boolean' ? navigator.cookieEnabled : null,
        plugins_count: navigator.plugins ? navigator.plugins.length : null
      },
      screen: {
        width: screen.width,
        height: screen.height,
        avail_width: screen.availWidth,
        avail_height: screen.availHeight,
        color_depth: screen.colorDepth,
        pixel_ratio: global.devicePixelRatio || 1
      },
      viewport: {
        width: global.innerWidth,
        height: global.innerHeight
      },
      webgl: getWebGLInfo(),
      location: {
        country_iso: (options && options.countryIso) || null,
        timezone: tz,
        utc_offset_minutes: utcOffsetMinutes,
        latitude: geo ? geo.latitude : null,
        longitude: geo ? geo.longitude : null,
        accuracy_meters: geo ? geo.accuracy_meters : null
      },
      client_hints: getClientHints(),
      behavior: getBehavior(),
      collected_at: new Date().toISOString()
    };
  }

  async function check(apiUrl, options) {
    var endpoint = apiUrl || '/fraud/check';
    var payload = await collectSignals(options || {});
    var response = await fetch(endpoint, {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(payload)
    });

    if (!response.ok) {
      var body = await response.text();
      throw new Error('Fraud check failed: ' + response.status + ' ' + body);
    }

    return response.json();
  }

  async function verifyCaptcha(apiUrl, challengeId, captchaToken) {
    var endpoint = apiUrl || '/fraud/captcha/verify';
    var response = await fetch(endpoint, {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ challenge_id: challengeId, captcha_token: captchaToken })
    });

    if (!response.ok) {
      var body = await response.text();
      throw new Error('Captcha verify failed: ' + response.status + ' ' + body);
    }

    return response.json();
  }

  var turnstileLoader = null;

  function loadTurnstileScript() {
    if (global.turnstile) return Promise.resolve();
    if (turnstileLoader) return turnstileLoader;

    turnstileLoader = new Promise(function (resolve, reject) {
      var script = document.createElement('script');
      script.src = '__TURNSTILE_JS_URL__';
      script.async = true;
      script.onload = function () { resolve(); };
      script.onerror = function () { reject(new Error('Failed to load Turnstile script')); };
      document.head.appendChild(script);
    });
    return turnstileLoader;
  }

  async function getTurnstileToken(siteKey, options) {
    await loadTurnstileScript();

    return await new Promise(function (resolve, reject) {
      var container = document.createElement('div');
      container.style.display = 'none';
      document.body.appendChild(container);

      var timeoutMs = (options && options.timeoutMs) || 30000;
      var timer = setTimeout(function () {
        container.remove();
        reject(new Error('Turnstile challenge timed out'));
      }, timeoutMs);

      global.turnstile.render(container, {
        sitekey: siteKey,
        callback: function (token) {
          clearTimeout(timer);
          container.remove();
          resolve(token);
        },
        'error-callback': function () {
          clearTimeout(timer);
          container.remove();
          reject(new Error('Turnstile challenge failed'));
        }
      });
    });
  }

  // Full flow: check, and when a captcha is demanded, solve it and verify.
  async function run(options) {
    options = options || {};
    var result = await check(options.checkUrl, options);

    if (result.captcha_required && result.challenge_id && result.captcha_site_key) {
      var token = await getTurnstileToken(result.captcha_site_key, options);
      return await verifyCaptcha(options.verifyUrl, result.challenge_id, token);
    }

    return result;
  }

  global.FraudCollector = {
    collectSignals: collectSignals,
    check: check,
    verifyCaptcha: verifyCaptcha,
    getTurnstileToken: getTurnstileToken,
    run: run
  };
})(window);
"#;
