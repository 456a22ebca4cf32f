//! Source text of the support library shipped next to emitted programs.
//!
//! The generator writes this out as `ml_runtime.py` (or relies on the
//! embedding host to provide it in silent mode). It mirrors the
//! semantics of the Rust-native helpers in this module.

pub const RUNTIME_MODULE_NAME: &str = "ml_runtime";

pub const RUNTIME_FILE_NAME: &str = "ml_runtime.py";

pub const RUNTIME_SOURCE: &str = r#"""Support library for transpiled ML programs.

Every helper here refuses attribute and method names beginning with an
underscore, no matter how the name was constructed. This is the runtime
floor of the security model.
"""

import fnmatch
import hashlib
import json as _json
import math as _math
import threading
import uuid
from contextlib import contextmanager

DANGEROUS_NAMES = frozenset([
    "class", "dict", "globals", "locals", "vars", "bases", "mro",
    "subclasses", "code", "closure", "import", "builtins",
    "eval", "exec", "compile",
])

SAFE_ATTRIBUTES = {
    str: frozenset([
        "upper", "lower", "strip", "split", "join", "replace",
        "startswith", "endswith", "find",
    ]),
    list: frozenset([
        "append", "pop", "insert", "remove", "index", "count",
        "sort", "reverse", "extend",
    ]),
    dict: frozenset(["keys", "values", "items", "get"]),
}


class MLSecurityError(Exception):
    pass


class MLAttributeError(Exception):
    pass


class MLCapabilityError(Exception):
    pass


class MLUserException(Exception):
    """Exception constructed by the ML `throw` statement."""

    def __init__(self, payload):
        self.payload = payload
        super().__init__(str(payload))


def _check_name(name):
    if name.startswith("_"):
        raise MLSecurityError(
            "names beginning with '_' are never reachable: %r" % name)
    if name in DANGEROUS_NAMES:
        raise MLSecurityError("name is blacklisted: %r" % name)


def _is_ml_object(obj):
    return isinstance(obj, dict) and all(isinstance(key, str) for key in obj)


def is_user_module_namespace(obj):
    return getattr(type(obj), "_is_user_module", False) or \
        getattr(obj, "_is_user_module", False) is True


def _is_namespace(obj):
    return isinstance(obj, _ModuleNamespace) or is_user_module_namespace(obj)


def safe_attr_access(obj, name):
    _check_name(name)
    if _is_ml_object(obj):
        if name in obj:
            return obj[name]
        raise MLAttributeError("object has no attribute %r" % name)
    if _is_namespace(obj):
        try:
            return object.__getattribute__(obj, name)
        except AttributeError:
            raise MLAttributeError("module has no member %r" % name)
    allowed = SAFE_ATTRIBUTES.get(type(obj), frozenset())
    if name in allowed:
        return getattr(obj, name)
    raise MLAttributeError(
        "attribute %r is not whitelisted on %s" % (name, type(obj).__name__))


def safe_attr_assign(obj, name, value):
    _check_name(name)
    if _is_ml_object(obj):
        obj[name] = value
        return value
    raise MLAttributeError(
        "cannot assign attribute %r on %s" % (name, type(obj).__name__))


def safe_method_call(obj, name, *args, **kwargs):
    _check_name(name)
    if _is_ml_object(obj):
        member = obj.get(name)
        if member is None:
            raise MLAttributeError("object has no method %r" % name)
        if not callable(member):
            raise MLAttributeError("attribute %r is not callable" % name)
        return safe_call(member, *args, **kwargs)
    if _is_namespace(obj):
        member = safe_attr_access(obj, name)
        if not callable(member):
            raise MLAttributeError("member %r is not callable" % name)
        return safe_call(member, *args, **kwargs)
    allowed = SAFE_ATTRIBUTES.get(type(obj), frozenset())
    if name not in allowed:
        raise MLAttributeError(
            "method %r is not whitelisted on %s" % (name, type(obj).__name__))
    return getattr(obj, name)(*args, **kwargs)


# ----------------------------------------------------------------------
# capabilities

class CapabilityToken:
    """Immutable permission certificate. The usage counter is the only
    mutable field; everything else is covered by the checksum."""

    def __init__(self, capability_type, resource_patterns, operations,
                 expires_at=None, usage_cap=None, max_file_size=None,
                 network_hosts=()):
        self.id = str(uuid.uuid4())
        self.capability_type = capability_type
        self.resource_patterns = tuple(resource_patterns)
        self.operations = frozenset(operations)
        self.expires_at = expires_at
        self.usage_cap = usage_cap
        self.max_file_size = max_file_size
        self.network_hosts = tuple(network_hosts)
        self.usage = 0
        self.checksum = self._compute_checksum()

    def _compute_checksum(self):
        canonical = "\x1f".join([
            self.id,
            self.capability_type,
            ",".join(self.resource_patterns),
            ",".join(sorted(self.operations)),
            repr(self.expires_at),
            repr(self.usage_cap),
            repr(self.max_file_size),
            ",".join(self.network_hosts),
        ])
        return hashlib.sha256(canonical.encode("utf-8")).hexdigest()

    def validate(self):
        import time
        if self.checksum != self._compute_checksum():
            raise MLCapabilityError(
                "capability %r failed its integrity check" % self.capability_type)
        if self.expires_at is not None and time.time() >= self.expires_at:
            raise MLCapabilityError(
                "capability %r has expired" % self.capability_type)
        if self.usage_cap is not None and self.usage >= self.usage_cap:
            raise MLCapabilityError(
                "capability %r exceeded its usage cap" % self.capability_type)

    def matches(self, resource, operation):
        if operation not in self.operations:
            raise MLCapabilityError(
                "capability %r does not allow %r" % (self.capability_type, operation))
        if not any(fnmatch.fnmatch(resource, pattern)
                   for pattern in self.resource_patterns):
            raise MLCapabilityError(
                "capability %r does not cover %r" % (self.capability_type, resource))

    def record_use(self):
        self.validate()
        self.usage += 1


class _ContextState(threading.local):
    def __init__(self):
        self.stack = []


_context_state = _ContextState()
_context_lock = threading.RLock()


class CapabilityContext:
    def __init__(self, parent=None):
        self.parent = parent
        self.tokens = {}

    def add_token(self, token):
        with _context_lock:
            self.tokens[token.capability_type] = token

    def remove_token(self, capability_type):
        with _context_lock:
            self.tokens.pop(capability_type, None)

    def find_token(self, capability_type):
        with _context_lock:
            token = self.tokens.get(capability_type)
            if token is not None:
                try:
                    token.validate()
                    return token
                except MLCapabilityError:
                    del self.tokens[capability_type]
        if self.parent is not None:
            return self.parent.find_token(capability_type)
        return None

    def capability_types(self):
        types = set()
        if self.parent is not None:
            types.update(self.parent.capability_types())
        with _context_lock:
            types.update(self.tokens.keys())
        return sorted(types)


def _current_context():
    stack = _context_state.stack
    return stack[-1] if stack else None


def create_capability(capability_type, resource_patterns, operations,
                      **constraints):
    return CapabilityToken(capability_type, resource_patterns, operations,
                           **constraints)


@contextmanager
def use_capability(*tokens):
    context = CapabilityContext(parent=_current_context())
    for token in tokens:
        context.add_token(token)
    _context_state.stack.append(context)
    try:
        yield context
    finally:
        _context_state.stack.pop()


def has_capability(capability_type):
    context = _current_context()
    return context is not None and \
        context.find_token(capability_type) is not None


def get_capabilities():
    context = _current_context()
    return context.capability_types() if context else []


def get_capability_info(capability_type):
    context = _current_context()
    token = context.find_token(capability_type) if context else None
    if token is None:
        return None
    return {
        "type": token.capability_type,
        "resources": list(token.resource_patterns),
        "operations": sorted(token.operations),
        "usage": token.usage,
    }


def required_capabilities(fn):
    return list(getattr(fn, "_ml_capabilities", ()))


def ml_capability(*capability_types):
    """Tag a routine with the capability types it requires."""
    def decorate(fn):
        fn._ml_capabilities = capability_types
        return fn
    return decorate


def safe_call(fn, *args, **kwargs):
    for capability_type in getattr(fn, "_ml_capabilities", ()):
        context = _current_context()
        token = context.find_token(capability_type) if context else None
        if token is None:
            raise MLCapabilityError("missing capability %r" % capability_type)
        token.record_use()
    return fn(*args, **kwargs)


# ----------------------------------------------------------------------
# builtin module

def _typeof(value):
    if value is None:
        return "null"
    if isinstance(value, bool):
        return "bool"
    if isinstance(value, int):
        return "int"
    if isinstance(value, float):
        return "float"
    if isinstance(value, str):
        return "str"
    if isinstance(value, list):
        return "list"
    if isinstance(value, dict):
        return "object"
    if callable(value):
        return "function"
    return type(value).__name__


def _getattr_builtin(obj, name, *default):
    try:
        return safe_attr_access(obj, name)
    except (MLSecurityError, MLAttributeError):
        if default:
            return default[0]
        raise


def _hasattr_builtin(obj, name):
    try:
        safe_attr_access(obj, name)
        return True
    except (MLSecurityError, MLAttributeError):
        return False


def _setattr_builtin(obj, name, value):
    safe_attr_assign(obj, name, value)
    return obj


def _call_builtin(fn, *args, **kwargs):
    return safe_call(fn, *args, **kwargs)


class _BuiltinNamespace:
    """Namespace backing `builtin.<name>` references in emitted code.
    Every member is routed through safe_call by construction."""

    def __init__(self, entries):
        self._entries = dict(entries)

    def __getattr__(self, name):
        try:
            fn = self._entries[name]
        except KeyError:
            raise MLAttributeError("unknown builtin %r" % name)

        def dispatch(*args, **kwargs):
            return safe_call(fn, *args, **kwargs)
        dispatch.__name__ = name
        return dispatch


builtin = _BuiltinNamespace({
    "int": int,
    "float": float,
    "str": str,
    "len": len,
    "range": lambda *args: list(range(*args)),
    "print": print,
    "typeof": _typeof,
    "abs": abs,
    "min": min,
    "max": max,
    "keys": lambda obj: list(obj.keys()),
    "values": lambda obj: list(obj.values()),
    "getattr": _getattr_builtin,
    "hasattr": _hasattr_builtin,
    "setattr": _setattr_builtin,
    "call": _call_builtin,
    "has_capability": has_capability,
    "get_capabilities": get_capabilities,
    "get_capability_info": get_capability_info,
    "required_capabilities": required_capabilities,
})


# ----------------------------------------------------------------------
# stdlib modules and user-module namespaces

class _ModuleNamespace:
    _is_user_module = False

    def __init__(self, name, members):
        self._name = name
        for member_name, member in members.items():
            object.__setattr__(self, member_name, member)


class _UserModuleNamespace(_ModuleNamespace):
    _is_user_module = True


def make_user_module(name, members):
    return _UserModuleNamespace(name, members)


@ml_capability("FileRead")
def _file_read_text(path):
    context = _current_context()
    token = context.find_token("FileRead") if context else None
    if token is None:
        raise MLCapabilityError("missing capability 'FileRead'")
    token.matches(path, "read")
    if token.max_file_size is not None:
        import os
        if os.path.getsize(path) > token.max_file_size:
            raise MLCapabilityError(
                "%r exceeds the capability's byte limit" % path)
    with open(path, "r", encoding="utf-8") as handle:
        return handle.read()


@ml_capability("FileWrite")
def _file_write_text(path, content):
    context = _current_context()
    token = context.find_token("FileWrite") if context else None
    if token is None:
        raise MLCapabilityError("missing capability 'FileWrite'")
    token.matches(path, "write")
    with open(path, "w", encoding="utf-8") as handle:
        handle.write(content)


@ml_capability("FileRead")
def _file_exists(path):
    import os
    context = _current_context()
    token = context.find_token("FileRead") if context else None
    if token is None:
        raise MLCapabilityError("missing capability 'FileRead'")
    token.matches(path, "read")
    return os.path.exists(path)


_STDLIB_MODULES = {
    "math": {
        "sqrt": _math.sqrt,
        "floor": lambda value: int(_math.floor(value)),
        "ceil": lambda value: int(_math.ceil(value)),
        "pow": lambda base, exponent: base ** exponent,
        "sin": _math.sin,
        "cos": _math.cos,
    },
    "string": {
        "upper": lambda value: value.upper(),
        "lower": lambda value: value.lower(),
        "strip": lambda value: value.strip(),
        "split": lambda value, separator: value.split(separator),
        "join": lambda parts, separator: separator.join(parts),
        "replace": lambda value, old, new: value.replace(old, new),
        "contains": lambda value, needle: needle in value,
    },
    "json": {
        "dumps": _json.dumps,
        "loads": _json.loads,
    },
    "file": {
        "read_text": _file_read_text,
        "write_text": _file_write_text,
        "exists": _file_exists,
    },
}


def load_module(name):
    try:
        members = _STDLIB_MODULES[name]
    except KeyError:
        raise ImportError("unknown ML standard-library module %r" % name)
    return _ModuleNamespace(name, members)


def destructure_object(value, keys):
    """Extract the named keys of an ML object for `{a, b} = e;`."""
    if not _is_ml_object(value):
        raise MLAttributeError("cannot destructure a non-object value")
    return tuple(safe_attr_access(value, key) for key in keys)
"#;
